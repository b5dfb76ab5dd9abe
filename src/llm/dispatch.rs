//! Completion dispatcher — one provider request per turn, bounded by a hard
//! deadline.
//!
//! ```text
//! dispatch ──▶ PendingCompletion::spawn ──▶ task: select { cancel | provider }
//!                     │
//!                     └── race(timeout) ──▶ Ok(text)           → ok:true
//!                                       └─▶ Err / deadline hit → ok:false
//! ```
//!
//! On deadline the pending task is cancelled and aborted, so its result can
//! never reach the caller. Provider errors are logged and folded into
//! `ok:false`; `dispatch` itself never fails.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::ContextBundle;
use crate::llm::{CompletionProvider, CompletionRequest, ConversationTurn, ProviderError};

/// Default deadline for a remote completion.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);

// ── ReplyOutcome ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Local,
    Remote,
}

/// Result of one reply attempt. `text` is empty when `ok` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyOutcome {
    pub ok: bool,
    pub text: String,
    pub source: ReplySource,
}

impl ReplyOutcome {
    pub fn local(text: impl Into<String>) -> Self {
        Self { ok: true, text: text.into(), source: ReplySource::Local }
    }

    pub fn remote(text: impl Into<String>) -> Self {
        Self { ok: true, text: text.into(), source: ReplySource::Remote }
    }

    pub fn remote_failed() -> Self {
        Self { ok: false, text: String::new(), source: ReplySource::Remote }
    }
}

// ── PendingCompletion ─────────────────────────────────────────────────────────

/// An in-flight provider request that can be raced against a deadline.
///
/// Dropping it cancels the request.
pub struct PendingCompletion {
    handle: Option<JoinHandle<Result<String, ProviderError>>>,
    cancel: CancellationToken,
}

impl PendingCompletion {
    /// Start `request` on a new task.
    pub fn spawn(provider: Arc<CompletionProvider>, request: CompletionRequest) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(ProviderError::Cancelled),
                result = provider.complete(&request) => result,
            }
        });
        Self { handle: Some(handle), cancel }
    }

    /// Token observed by the request task.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the result until `timeout`. On deadline the request is
    /// cancelled and its eventual result discarded.
    pub async fn race(mut self, timeout: Duration) -> Result<String, ProviderError> {
        let Some(mut handle) = self.handle.take() else {
            return Err(ProviderError::Cancelled);
        };
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ProviderError::Request(format!("completion task failed: {e}"))),
            Err(_) => {
                self.cancel.cancel();
                handle.abort();
                Err(ProviderError::Timeout(
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        }
    }

    /// Cancel the request without waiting for it.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for PendingCompletion {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Sends conversations to one provider. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    provider: Arc<CompletionProvider>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(provider: CompletionProvider, timeout: Duration) -> Self {
        Self { provider: Arc::new(provider), timeout }
    }

    /// Configured deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Send `turns` plus `context` and wait at most `timeout`.
    pub async fn dispatch(
        &self,
        turns: &[ConversationTurn],
        context: &ContextBundle,
        timeout: Duration,
    ) -> ReplyOutcome {
        let request = CompletionRequest { messages: turns.to_vec(), context: context.clone() };
        let pending = PendingCompletion::spawn(Arc::clone(&self.provider), request);

        match pending.race(timeout).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!(provider = self.provider.name(), chars = text.len(), "remote reply received");
                ReplyOutcome::remote(text)
            }
            Ok(_) => {
                warn!(provider = self.provider.name(), "remote reply was blank");
                ReplyOutcome::remote_failed()
            }
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "remote completion failed");
                ReplyOutcome::remote_failed()
            }
        }
    }
}
