//! Relay completion provider.
//!
//! POSTs `{messages, context}` to a relay endpoint (such as this crate's own
//! `POST /api/chat`) which holds the upstream API key and builds the system
//! prompt. The relay answers with one of:
//!
//! ```text
//! { "reply": "…" }
//! { "message": "…" }
//! { "choices": [ { "message": { "content": "…" } } ] }
//! { "error": "…" }                      (any status)
//! ```

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::llm::{CompletionRequest, ProviderError};

#[derive(Debug, Clone)]
pub struct RelayProvider {
    client: Client,
    api_url: String,
}

impl RelayProvider {
    /// Build a provider for `api_url`. No client-side timeout is set; the
    /// dispatcher owns the deadline.
    pub fn new(api_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, api_url: api_url.into() })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        debug!(url = %self.api_url, messages = request.messages.len(), "sending relay request");

        let response = self
            .client
            .post(&self.api_url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_url, error = %e, "relay request failed (transport)");
                ProviderError::Request(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(format!("failed to read response body: {e}")))?;
        let parsed: Option<RelayResponse> = serde_json::from_str(&body).ok();

        if let Some(message) = parsed.as_ref().and_then(RelayResponse::error_message) {
            return Err(if status.is_success() {
                ProviderError::Remote(message)
            } else {
                ProviderError::Status { status: status.as_u16(), message }
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Status { status: status.as_u16(), message: body });
        }

        let parsed = parsed
            .ok_or_else(|| ProviderError::Request("response body is not valid JSON".into()))?;
        parsed.into_text().ok_or(ProviderError::EmptyReply)
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl RelayResponse {
    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(o) => Some(
                o.get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| serde_json::Value::Object(o.clone()).to_string()),
            ),
            other => Some(other.to_string()),
        }
    }

    /// First present of `reply`, `message`, `choices[0].message.content`,
    /// returned as sent. Only absent or `null` fields are skipped; a blank
    /// string is still an answer and is judged by the dispatcher.
    fn into_text(self) -> Option<String> {
        self.reply
            .or(self.message)
            .or_else(|| self.choices.into_iter().next().and_then(|c| c.message.content))
    }
}
