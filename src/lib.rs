//! portfolio-bot — answers questions about a personal knowledge base.
//!
//! Each turn is matched locally by the intent resolver, optionally sent to a
//! remote completion provider under a deadline, and always answered.
//! The binary entry point is src/main.rs.

pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod intent;
pub mod knowledge;
pub mod llm;
pub mod logger;
pub mod markup;
pub mod prompt;
pub mod reply;
pub mod subsystems;
