//! Long-running subsystems: the comms channels and their shared runtime.

pub mod comms;
pub mod runtime;
