//! Comms subsystem — manages all external I/O channels.
//!
//! # Architecture
//!
//! Each channel (PTY, HTTP) implements [`Component`] and is spawned as an
//! independent concurrent task by [`start`] via [`spawn_components`].
//! Channels capture their shared [`Arc<CommsState>`] at construction time; no
//! state is passed through the generic `Component::run` signature.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (lifecycle events, session tracking). This is drained in a
//! short-lived background task that dies naturally when all channel senders
//! are dropped.
//!
//! # Starting
//!
//! [`start`] returns a [`SubsystemHandle`] as soon as the tasks are spawned.
//! The caller decides when (or whether) to await it.

mod state;
#[cfg(feature = "channel-pty")]
pub mod pty;
#[cfg(feature = "channel-axum")]
pub mod axum_channel;

pub use state::{CommsEvent, CommsState, DEFAULT_MAX_SESSION_TURNS, DEFAULT_MAX_SESSIONS};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chat::ChatEngine;
use crate::config::Config;
use crate::error::AppError;
use crate::subsystems::runtime::{Component, SubsystemHandle, spawn_components};

// ── start ───────────────────────────────────────────────────────────────────

/// Spawn all configured comms channels and return a [`SubsystemHandle`].
///
/// Channels start immediately. If any channel exits with an error the shared
/// `shutdown` token is cancelled so siblings stop cooperatively. The handle
/// resolves when all channels have exited.
///
/// Fails only when a channel cannot be constructed (e.g. the relay upstream
/// HTTP client).
pub fn start(
    config: &Config,
    engine: Arc<ChatEngine>,
    shutdown: CancellationToken,
) -> Result<SubsystemHandle, AppError> {
    // Intra-subsystem event channel: channels → manager.
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(CommsState::with_limits(
        engine,
        event_tx,
        config.comms.http.max_sessions,
        DEFAULT_MAX_SESSION_TURNS,
    ));

    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            components.push(Box::new(pty::PtyChannel::new("pty0", state.clone())));
        }
    }

    #[cfg(feature = "channel-axum")]
    {
        if config.comms_http_should_load() {
            let relay = if config.comms.http.relay {
                Some(Arc::new(build_relay_upstream(config, &state)?))
            } else {
                None
            };
            info!(bind = %config.comms.http.bind, relay = relay.is_some(), "loading axum channel");
            components.push(Box::new(axum_channel::AxumChannel::new(
                "http0",
                config.comms.http.bind.clone(),
                state.clone(),
                relay,
            )));
        }
    }

    if components.is_empty() {
        info!("no comms channels configured — waiting for shutdown");
    }

    // Monitoring-only drain; it ends once every channel has dropped its state.
    tokio::spawn(async move {
        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelShutdown { ref channel_id } => {
                    debug!(channel_id, "channel reported shutdown");
                }
                CommsEvent::SessionStarted { ref channel_id, session_id } => {
                    debug!(channel_id, %session_id, "channel session started");
                }
            }
        }
    });

    Ok(spawn_components(components, shutdown))
}

#[cfg(feature = "channel-axum")]
fn build_relay_upstream(
    config: &Config,
    state: &CommsState,
) -> Result<axum_channel::relay::RelayUpstream, AppError> {
    use crate::llm::Persona;
    use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;

    let oai = &config.remote.openai;
    let upstream = OpenAiCompatibleProvider::new(
        oai.api_base_url.clone(),
        oai.model.clone(),
        oai.temperature,
        oai.max_tokens,
        oai.timeout_seconds,
        config.llm_api_key.clone(),
    )
    .map_err(|e| AppError::Comms(format!("relay upstream: {e}")))?;
    let persona = Persona {
        owner: state.engine().knowledge().owner.name.clone(),
        prompts_dir: config.remote.prompts_dir.clone(),
    };
    Ok(axum_channel::relay::RelayUpstream::new(upstream, persona))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeBase;

    #[tokio::test]
    async fn start_with_no_channels_ends_on_its_own() {
        let mut config = Config::test_default();
        config.comms.pty.enabled = false;
        config.comms.http.enabled = false;
        let engine = Arc::new(ChatEngine::new(Arc::new(KnowledgeBase::test_default()), None));
        let handle = start(&config, engine, CancellationToken::new()).unwrap();
        handle.join().await.unwrap();
    }

    #[cfg(feature = "channel-axum")]
    #[tokio::test]
    async fn http_channel_stops_on_shutdown() {
        let mut config = Config::test_default();
        config.comms.pty.enabled = false;
        config.comms.http.enabled = true;
        config.comms.http.bind = "127.0.0.1:0".into();
        config.comms.http.relay = true;
        let engine = Arc::new(ChatEngine::new(Arc::new(KnowledgeBase::test_default()), None));
        let shutdown = CancellationToken::new();
        let handle = start(&config, engine, shutdown.clone()).unwrap();
        shutdown.cancel();
        handle.join().await.unwrap();
    }
}
