//! `POST /api/chat` relay endpoint.
//!
//! Accepts `{messages, context}`, builds the system prompt from the context
//! and forwards the conversation to an OpenAI-compatible upstream. The
//! upstream key lives only on this server, so browser or console clients can
//! use the `relay` provider without holding it.
//!
//! ```text
//! 200 {reply}   upstream answered (blank answers become an apology)
//! 500 {error}   no API key configured
//! 502 {error}   upstream failed
//! ```

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::{CompletionRequest, Persona, ProviderError};
use crate::prompt;

use super::AxumState;

pub const EMPTY_REPLY_APOLOGY: &str = "Sorry, I couldn't generate a reply.";

/// Upstream provider plus the persona its system prompt describes.
#[derive(Debug, Clone)]
pub struct RelayUpstream {
    upstream: OpenAiCompatibleProvider,
    persona: Persona,
}

impl RelayUpstream {
    pub fn new(upstream: OpenAiCompatibleProvider, persona: Persona) -> Self {
        Self { upstream, persona }
    }
}

/// POST /api/chat
pub(super) async fn chat(
    State(state): State<AxumState>,
    Json(req): Json<CompletionRequest>,
) -> Response {
    let Some(relay) = state.relay.as_ref() else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "relay disabled" }))).into_response();
    };
    if !relay.upstream.has_api_key() {
        warn!(channel_id = %state.channel_id, "relay request without LLM_API_KEY configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Set LLM_API_KEY in the server environment to enable the relay." })),
        )
            .into_response();
    }

    let system = prompt::system_prompt(&relay.persona.prompts_dir, &relay.persona.owner, &req.context);
    debug!(channel_id = %state.channel_id, turns = req.messages.len(), "relaying chat");

    match relay.upstream.complete_chat(&system, &req.messages).await {
        Ok(reply) => (StatusCode::OK, Json(json!({ "reply": reply.trim() }))).into_response(),
        Err(ProviderError::EmptyReply) => {
            (StatusCode::OK, Json(json!({ "reply": EMPTY_REPLY_APOLOGY }))).into_response()
        }
        Err(e) => {
            warn!(channel_id = %state.channel_id, error = %e, "relay upstream failed");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}
