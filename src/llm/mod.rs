//! Remote completion layer.
//!
//! `CompletionProvider` is an enum over concrete backends. Add a new variant
//! and module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities, held behind an `Arc`
//! by the [`dispatch::Dispatcher`]. The `complete` method is `async fn` on the
//! enum so callers need no trait-object machinery.

pub mod dispatch;
pub mod providers;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::ContextBundle;
use crate::prompt;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("provider reported an error: {0}")]
    Remote(String),
    #[error("provider returned an empty reply")]
    EmptyReply,
    #[error("completion timed out after {0} ms")]
    Timeout(u64),
    #[error("completion cancelled")]
    Cancelled,
}

// ── Conversation wire types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Body of a remote completion request: the whole conversation so far plus
/// the knowledge context. Also the request shape accepted by the relay
/// endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
    pub context: ContextBundle,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// Who the system prompt speaks about, and where its template lives.
#[derive(Debug, Clone)]
pub struct Persona {
    pub owner: String,
    pub prompts_dir: PathBuf,
}

/// All available completion backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `complete` arm.
#[derive(Debug, Clone)]
pub enum CompletionProvider {
    /// Forwards `{messages, context}` to a relay endpoint.
    Relay(providers::relay::RelayProvider),
    /// Builds the system prompt locally and calls an OpenAI-compatible API.
    OpenAi {
        upstream: providers::openai_compatible::OpenAiCompatibleProvider,
        persona: Persona,
    },
    Dummy(providers::dummy::DummyProvider),
}

impl CompletionProvider {
    /// Send `request` to the backend and return its non-blank text reply.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        match self {
            CompletionProvider::Relay(p) => p.complete(request).await,
            CompletionProvider::OpenAi { upstream, persona } => {
                let system =
                    prompt::system_prompt(&persona.prompts_dir, &persona.owner, &request.context);
                upstream.complete_chat(&system, &request.messages).await
            }
            CompletionProvider::Dummy(p) => p.complete(request).await,
        }
    }

    /// Short backend name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            CompletionProvider::Relay(_) => "relay",
            CompletionProvider::OpenAi { .. } => "openai",
            CompletionProvider::Dummy(_) => "dummy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_serializes_lowercase_role() {
        let json = serde_json::to_string(&ConversationTurn::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
        let back: ConversationTurn =
            serde_json::from_str(r#"{"role":"assistant","content":"yo"}"#).unwrap();
        assert_eq!(back, ConversationTurn::assistant("yo"));
    }

    #[test]
    fn request_messages_default_to_empty() {
        let json = r#"{"context":{"summary":"s","contact":"c","projects":"","experience":"","education":"","skills":""}}"#;
        let req: CompletionRequest = serde_json::from_str(json).unwrap();
        assert!(req.messages.is_empty());
        assert_eq!(req.context.summary, "s");
    }

    #[test]
    fn status_error_display() {
        let e = ProviderError::Status { status: 502, message: "bad gateway".into() };
        assert_eq!(e.to_string(), "provider returned HTTP 502: bad gateway");
    }
}
