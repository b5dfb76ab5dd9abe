//! Axum-based HTTP channel — serves the chat API under `/api/`.
//!
//! Implements [`Component`] so it slots into the comms subsystem lifecycle:
//! `run()` drives the axum event loop and the shared [`CancellationToken`] is
//! wired to axum's graceful shutdown.
//!
//! ## URL layout
//!
//! ```text
//! GET  /api/health
//! GET  /api/quick-replies
//! POST /api/message       {message, quick_reply?, session_id?}
//! POST /api/chat          relay endpoint (only when enabled)
//! ```

mod api;
pub mod relay;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};

use super::state::CommsState;
use relay::RelayUpstream;

// ── Shared request state ──────────────────────────────────────────────────────

/// Axum router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — all fields are reference-counted.
#[derive(Clone)]
pub struct AxumState {
    /// Channel identifier used in log spans.
    pub channel_id: Arc<str>,
    /// Comms subsystem capabilities (sessions, chat engine).
    pub comms: Arc<CommsState>,
    /// Upstream for `POST /api/chat`; the route is absent when `None`.
    pub relay: Option<Arc<RelayUpstream>>,
}

// ── AxumChannel ───────────────────────────────────────────────────────────────

pub struct AxumChannel {
    channel_id: String,
    bind_addr: String,
    state: Arc<CommsState>,
    relay: Option<Arc<RelayUpstream>>,
}

impl AxumChannel {
    pub fn new(
        channel_id: impl Into<String>,
        bind_addr: impl Into<String>,
        state: Arc<CommsState>,
        relay: Option<Arc<RelayUpstream>>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            bind_addr: bind_addr.into(),
            state,
            relay,
        }
    }
}

impl Component for AxumChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        let state = AxumState {
            channel_id: Arc::from(self.channel_id.as_str()),
            comms: self.state,
            relay: self.relay,
        };
        Box::pin(run_axum(self.bind_addr, state, shutdown))
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

async fn run_axum(
    bind_addr: String,
    state: AxumState,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let channel_id = Arc::clone(&state.channel_id);
    let router = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("axum bind failed on {bind_addr}: {e}")))?;

    info!(%channel_id, %bind_addr, "axum channel listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("axum server error: {e}")))?;

    info!(%channel_id, "axum channel shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AxumState) -> Router {
    let mut router = Router::new()
        .route("/api/health",        get(api::health))
        .route("/api/quick-replies", get(api::quick_replies))
        .route("/api/message",       post(api::message));
    if state.relay.is_some() {
        router = router.route("/api/chat", post(relay::chat));
    }
    router.with_state(state)
}
