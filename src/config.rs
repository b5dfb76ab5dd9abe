//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory (or
//! the file given with `-f`), then applies `PORTFOLIO_LOG_LEVEL` and
//! `PORTFOLIO_CHAT_API_URL` env overrides. `LLM_API_KEY` is only ever read
//! from the environment.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::AppError;

/// Default location of the main config file.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub enabled: bool,
}

/// HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    /// Socket address to bind the HTTP channel to.
    pub bind: String,
    /// Also serve the `POST /api/chat` relay endpoint.
    pub relay: bool,
    /// Open sessions kept before the least recently used is dropped.
    pub max_sessions: usize,
}

#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub http: HttpConfig,
}

/// Relay backend configuration (`[remote.relay]`).
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_url: String,
}

/// OpenAI / OpenAI-compatible settings (`[remote.openai]`). Used by the
/// `openai` backend and as the upstream of the relay endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    pub max_tokens: u32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// Dummy backend settings (`[remote.dummy]`).
#[derive(Debug, Clone)]
pub struct DummyConfig {
    pub latency_ms: u64,
    pub fail: bool,
}

/// Remote completion configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Active backend: `"none"`, `"relay"`, `"openai"` or `"dummy"`.
    pub provider: String,
    pub timeout_ms: u64,
    /// Directory holding prompt templates (already expanded, no `~`).
    pub prompts_dir: PathBuf,
    pub relay: RelayConfig,
    pub openai: OpenAiConfig,
    pub dummy: DummyConfig,
}

impl RemoteConfig {
    /// `true` unless the provider is `"none"`.
    pub fn is_configured(&self) -> bool {
        self.provider != crate::llm::providers::NONE
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    /// Knowledge file path (already expanded, no `~`).
    pub knowledge_path: PathBuf,
    pub remote: RemoteConfig,
    pub comms: CommsConfig,
    /// API key from `LLM_API_KEY` env var. Never sourced from TOML.
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Returns `true` if the PTY channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if the HTTP channel should be loaded.
    pub fn comms_http_should_load(&self) -> bool {
        self.comms.http.enabled
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    remote: RawRemote,
    #[serde(default)]
    comms: RawComms,
}

#[derive(Deserialize)]
struct RawBot {
    #[serde(default = "default_bot_name")]
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_knowledge_path")]
    knowledge_path: String,
}

#[derive(Deserialize)]
struct RawRemote {
    #[serde(default = "default_provider")]
    provider: String,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(default = "default_prompts_dir")]
    prompts_dir: String,
    #[serde(default)]
    relay: RawRelay,
    #[serde(default)]
    openai: RawOpenAiConfig,
    #[serde(default)]
    dummy: RawDummy,
}

impl Default for RawRemote {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            timeout_ms: default_timeout_ms(),
            prompts_dir: default_prompts_dir(),
            relay: RawRelay::default(),
            openai: RawOpenAiConfig::default(),
            dummy: RawDummy::default(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawRelay {
    #[serde(default)]
    api_url: String,
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            max_tokens: default_openai_max_tokens(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawDummy {
    #[serde(default)]
    latency_ms: u64,
    #[serde(default = "default_false")]
    fail: bool,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    http: RawHttp,
}

#[derive(Deserialize)]
struct RawPty {
    /// Defaults to `true`: the console is the out-of-the-box channel.
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawHttp {
    /// Defaults to `false`: HTTP must be explicitly enabled.
    #[serde(default = "default_false")]
    enabled: bool,
    #[serde(default = "default_http_bind")]
    bind: String,
    #[serde(default = "default_false")]
    relay: bool,
    #[serde(default = "default_max_sessions")]
    max_sessions: usize,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RawHttp {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_http_bind(),
            relay: false,
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_bot_name() -> String { "portfolio-bot".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_knowledge_path() -> String { "config/knowledge.toml".to_string() }
fn default_provider() -> String { crate::llm::providers::NONE.to_string() }
fn default_timeout_ms() -> u64 { 8000 }
fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.5 }
fn default_openai_max_tokens() -> u32 { 500 }
fn default_openai_timeout_seconds() -> u64 { 30 }
fn default_http_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_max_sessions() -> usize { crate::subsystems::comms::DEFAULT_MAX_SESSIONS }
fn default_true() -> bool { true }
fn default_false() -> bool { false }

/// Load config from `path`, then apply env-var overrides.
pub fn load(path: &Path) -> Result<Config, AppError> {
    let log_level_override = env::var("PORTFOLIO_LOG_LEVEL").ok();
    let chat_api_url_override = env::var("PORTFOLIO_CHAT_API_URL").ok();
    load_from(path, log_level_override.as_deref(), chat_api_url_override.as_deref())
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
///
/// A non-empty `chat_api_url_override` selects the `relay` provider with that
/// URL regardless of `remote.provider`.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    chat_api_url_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let b = parsed.bot;
    let r = parsed.remote;

    if r.timeout_ms == 0 {
        return Err(AppError::Config("remote.timeout_ms must be greater than zero".into()));
    }

    let log_level = log_level_override.unwrap_or(&b.log_level).to_string();
    crate::logger::parse_level(&log_level)
        .map_err(|e| AppError::Config(format!("bot.log_level: {e}")))?;

    let (provider, api_url) = match chat_api_url_override.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => ("relay".to_string(), url.to_string()),
        None => (r.provider, r.relay.api_url),
    };

    Ok(Config {
        bot_name: b.name,
        log_level,
        knowledge_path: expand_home(&b.knowledge_path),
        remote: RemoteConfig {
            provider,
            timeout_ms: r.timeout_ms,
            prompts_dir: expand_home(&r.prompts_dir),
            relay: RelayConfig { api_url },
            openai: OpenAiConfig {
                api_base_url: r.openai.api_base_url,
                model: r.openai.model,
                temperature: r.openai.temperature,
                max_tokens: r.openai.max_tokens,
                timeout_seconds: r.openai.timeout_seconds,
            },
            dummy: DummyConfig { latency_ms: r.dummy.latency_ms, fail: r.dummy.fail },
        },
        comms: CommsConfig {
            pty: PtyConfig { enabled: parsed.comms.pty.enabled },
            http: HttpConfig {
                enabled: parsed.comms.http.enabled,
                bind: parsed.comms.http.bind,
                relay: parsed.comms.http.relay,
                max_sessions: parsed.comms.http.max_sessions,
            },
        },
        llm_api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty()),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests — no remote, no API keys, no external calls.
#[cfg(test)]
impl Config {
    pub fn test_default() -> Self {
        Self {
            bot_name: "test".into(),
            log_level: "info".into(),
            knowledge_path: PathBuf::from("config/knowledge.toml"),
            remote: RemoteConfig {
                provider: "none".into(),
                timeout_ms: default_timeout_ms(),
                prompts_dir: PathBuf::from("config/prompts"),
                relay: RelayConfig { api_url: "http://127.0.0.1:0/api/chat".into() },
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    max_tokens: 100,
                    timeout_seconds: 1,
                },
                dummy: DummyConfig { latency_ms: 0, fail: false },
            },
            comms: CommsConfig {
                pty: PtyConfig { enabled: true },
                http: HttpConfig {
                    enabled: false,
                    bind: default_http_bind(),
                    relay: false,
                    max_sessions: default_max_sessions(),
                },
            },
            llm_api_key: None,
        }
    }
}
