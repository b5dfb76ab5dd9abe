//! Component runtime — shared scaffolding for long-running channels.
//!
//! A [`Component`] is an independently-runnable unit (the PTY console, the
//! axum server). The comms subsystem constructs components with their shared
//! state already captured inside them, then hands them to
//! [`spawn_components`], which runs them concurrently on one `JoinSet`.
//!
//! Any component error or panic cancels the shared [`CancellationToken`] so
//! sibling components stop too, and the first error is reported through the
//! returned [`SubsystemHandle`].

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::AppError;

// ── Component ─────────────────────────────────────────────────────────────────

/// A boxed, owned future returned by [`Component::run`].
pub type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A self-contained, concurrently-runnable unit.
///
/// [`Component::run`] is called once and should run until `shutdown` is
/// cancelled or the component's own work is done.
pub trait Component: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    /// Consume the component and return its run-loop as a boxed future.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

// ── SubsystemHandle ───────────────────────────────────────────────────────────

/// Handle to a running component set, resolved when every component exits.
pub struct SubsystemHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl SubsystemHandle {
    /// Await all components and return the first error, if any.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Comms(format!("subsystem task panicked: {e}"))),
        }
    }
}

// ── spawn_components ──────────────────────────────────────────────────────────

/// Spawn each [`Component`] as its own task and return a [`SubsystemHandle`].
///
/// On the first `Err` or panic, `shutdown` is cancelled; the remaining
/// components are drained and the first error is returned.
pub fn spawn_components(
    components: Vec<Box<dyn Component>>,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        for component in components {
            debug!(component = %component.id(), "spawning component");
            set.spawn(component.run(shutdown.clone()));
        }

        let mut first_err: Option<AppError> = None;

        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("component panicked: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert_with(|| AppError::Comms(format!("component panicked: {e}")));
                }
                Ok(Err(e)) => {
                    error!("component error: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        first_err.map_or(Ok(()), Err)
    });

    SubsystemHandle { inner: handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Waits for shutdown, then exits cleanly.
    struct Waiter;

    impl Component for Waiter {
        fn id(&self) -> &str {
            "waiter"
        }

        fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async move {
                shutdown.cancelled().await;
                Ok(())
            })
        }
    }

    /// Fails immediately.
    struct Failer;

    impl Component for Failer {
        fn id(&self) -> &str {
            "failer"
        }

        fn run(self: Box<Self>, _shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async { Err(AppError::Comms("bind failed".into())) })
        }
    }

    #[tokio::test]
    async fn empty_set_resolves_ok() {
        spawn_components(Vec::new(), CancellationToken::new()).join().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_components() {
        let token = CancellationToken::new();
        let handle = spawn_components(vec![Box::new(Waiter), Box::new(Waiter)], token.clone());
        token.cancel();
        handle.join().await.unwrap();
    }

    #[tokio::test]
    async fn error_cancels_siblings_and_is_reported() {
        let token = CancellationToken::new();
        let handle = spawn_components(vec![Box::new(Waiter), Box::new(Failer)], token.clone());
        let err = handle.join().await.unwrap_err();
        assert_eq!(err.to_string(), "comms error: bind failed");
        assert!(token.is_cancelled());
    }
}
