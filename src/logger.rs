//! Logging setup for the bot — one `tracing-subscriber` on stderr.
//!
//! stdout belongs to the console channel's replies, so every log line goes to
//! stderr. The filter is chosen as follows:
//!
//! ```text
//! -v flags       (prefer_level = true)   → RUST_LOG only if the flag level is bad
//! RUST_LOG       (prefer_level = false)  → else the configured bot.log_level
//! ```
//!
//! A filter built from a bare level also caps the HTTP client and server
//! crates at `warn`, so `-vvvv` traces the chat pipeline rather than every
//! socket read.

use tracing::debug;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

use crate::error::AppError;

/// Crates whose chatter is capped when the filter is a bare level.
const QUIET_TARGETS: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "h2=warn"];

/// Where the active filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSource {
    /// The level passed to [`init`] (CLI flag or config).
    Level,
    /// The `RUST_LOG` directive string.
    RustLog,
}

/// Install the global subscriber.
///
/// `level` is a level name such as `"info"`. With `prefer_level` the level
/// wins over `RUST_LOG`; without it `RUST_LOG` wins when set and valid.
pub fn init(level: &str, prefer_level: bool) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, source) = resolve_filter(level, prefer_level, rust_log.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    debug!(?source, level, "logger initialised");
    Ok(())
}

/// Pick and build the filter without touching process state.
pub fn resolve_filter(
    level: &str,
    prefer_level: bool,
    rust_log: Option<&str>,
) -> Result<(EnvFilter, FilterSource), AppError> {
    let from_rust_log = || {
        rust_log
            .filter(|d| !d.trim().is_empty())
            .and_then(|d| EnvFilter::try_new(d).ok())
            .map(|f| (f, FilterSource::RustLog))
    };

    let chosen = if prefer_level {
        level_filter(level).ok().or_else(from_rust_log)
    } else {
        from_rust_log().or_else(|| level_filter(level).ok())
    };

    chosen.ok_or_else(|| {
        AppError::Logger(format!(
            "invalid log level '{level}' and no usable {}",
            EnvFilter::DEFAULT_ENV
        ))
    })
}

fn level_filter(level: &str) -> Result<(EnvFilter, FilterSource), AppError> {
    let max = parse_level(level)?;
    let mut filter = EnvFilter::try_new(max.to_string())
        .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))?;
    for target in QUIET_TARGETS {
        let directive: Directive = target
            .parse()
            .map_err(|e| AppError::Logger(format!("bad built-in directive '{target}': {e}")))?;
        filter = filter.add_directive(directive);
    }
    Ok((filter, FilterSource::Level))
}

/// Parse a plain level name. Used for `bot.log_level` validation and the
/// `-v` tiers.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.trim().is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
