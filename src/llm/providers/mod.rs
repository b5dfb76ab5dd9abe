//! Completion provider implementations.
//!
//! `build(config, api_key, owner)` is the factory, called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod openai_compatible;
pub mod relay;

use std::time::Duration;

use crate::config::RemoteConfig;
use crate::llm::{CompletionProvider, Persona, ProviderError};

/// Provider name meaning "no remote backend".
pub const NONE: &str = "none";

/// Construct the configured provider, or `None` when the remote is disabled.
///
/// `api_key` is sourced from `LLM_API_KEY` env (never TOML) and only used by
/// the `openai` backend.
pub fn build(
    config: &RemoteConfig,
    api_key: Option<String>,
    owner: &str,
) -> Result<Option<CompletionProvider>, ProviderError> {
    let provider = match config.provider.as_str() {
        NONE => return Ok(None),
        "dummy" => {
            let behaviour = if config.dummy.fail {
                dummy::DummyBehaviour::Fail
            } else {
                dummy::DummyBehaviour::Echo
            };
            CompletionProvider::Dummy(dummy::DummyProvider::new(
                Duration::from_millis(config.dummy.latency_ms),
                behaviour,
            ))
        }
        "relay" => {
            if config.relay.api_url.trim().is_empty() {
                return Err(ProviderError::Request("remote.relay.api_url is empty".into()));
            }
            CompletionProvider::Relay(relay::RelayProvider::new(config.relay.api_url.clone())?)
        }
        "openai" | "openai-compatible" => {
            let oai = &config.openai;
            let upstream = openai_compatible::OpenAiCompatibleProvider::new(
                oai.api_base_url.clone(),
                oai.model.clone(),
                oai.temperature,
                oai.max_tokens,
                oai.timeout_seconds,
                api_key,
            )?;
            CompletionProvider::OpenAi {
                upstream,
                persona: Persona {
                    owner: owner.to_string(),
                    prompts_dir: config.prompts_dir.clone(),
                },
            }
        }
        other => return Err(ProviderError::UnknownProvider(other.to_string())),
    };
    Ok(Some(provider))
}
