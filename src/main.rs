//! portfolio-bot — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Load the knowledge base
//!   6. Build the remote provider (if any) and the chat engine
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Run comms channels until shutdown

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use portfolio_bot::chat::ChatEngine;
use portfolio_bot::error::AppError;
use portfolio_bot::llm::dispatch::Dispatcher;
use portfolio_bot::llm::providers;
use portfolio_bot::{config, knowledge, logger, subsystems};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args(std::env::args().skip(1));
    if args.help {
        print_help();
        return Ok(());
    }

    let config_path = args.config_path.as_deref().unwrap_or(config::DEFAULT_CONFIG_PATH);
    let mut config = config::load(Path::new(config_path))?;

    // Without -i the console stays off (daemon-safe default).
    if !args.interactive {
        config.comms.pty.enabled = false;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        bot_name = %config.bot_name,
        config = %config_path,
        effective_log_level = %effective_log_level,
        interactive = %args.interactive,
        "config loaded"
    );

    let knowledge = Arc::new(knowledge::load(&config.knowledge_path)?);

    let provider = providers::build(&config.remote, config.llm_api_key.clone(), &knowledge.owner.name)
        .map_err(|e| AppError::Config(format!("remote provider: {e}")))?;
    let dispatcher = provider.map(|p| Dispatcher::new(p, config.remote.timeout()));
    match &dispatcher {
        Some(d) => info!(provider = d.provider_name(), timeout_ms = config.remote.timeout_ms, "remote completion enabled"),
        None => info!("no remote provider — answering locally"),
    }

    let engine = Arc::new(ChatEngine::new(Arc::clone(&knowledge), dispatcher));

    if !config.comms_pty_should_load() && !config.comms_http_should_load() {
        warn!("no comms channel enabled — pass -i for the console or set [comms.http] enabled = true");
    }

    // Shared shutdown token — Ctrl-C cancels it, all channels watch it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let comms = subsystems::comms::start(&config, engine, shutdown.clone())?;
    let result = comms.join().await;

    // If comms exited due to EOF (not Ctrl-C), still signal everything to stop.
    shutdown.cancel();

    if args.interactive {
        println!("\nBye :) ...");
    }

    result
}

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    help: bool,
    interactive: bool,
    config_path: Option<String>,
    log_level: Option<&'static str>,
}

fn print_help() {
    println!("Usage: portfolio-bot [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -h, --help                 Print help");
    println!("  -i, --interactive          Run the console chat (PTY channel)");
    println!("  -f, --config <PATH>        Path to configuration file (default: {})", config::DEFAULT_CONFIG_PATH);
    println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
}

fn parse_cli_args(args: impl Iterator<Item = String>) -> CliArgs {
    let mut verbosity = 0u8;
    let mut out = CliArgs::default();

    let mut iter = args;
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => out.help = true,
            "-i" | "--interactive" => out.interactive = true,
            "-f" | "--config" => match iter.next() {
                Some(path) => out.config_path = Some(path),
                None => {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            },
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add(u8::try_from(a.len() - 1).unwrap_or(u8::MAX));
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier:
    //   -v      → warn
    //   -vv     → info
    //   -vvv    → debug  (routing decisions, provider calls)
    //   -vvvv+  → trace  (full payload dumps)
    out.log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    out
}
