//! PTY (console) comms channel — reads lines from stdin, answers each one in
//! a single console session, prints the rendered reply to stdout.
//!
//! Lines starting with `/` are quick replies (`/work`, `/about`, `/skills`,
//! `/contact`); `/help` lists them. Runs until the `shutdown` token is
//! cancelled (Ctrl-C) or stdin is closed.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::intent::Category;
use crate::markup;
use crate::subsystems::runtime::{Component, ComponentFuture};

use super::state::{CommsEvent, CommsState};

// ── PtyChannel ───────────────────────────────────────────────────────────────

/// A PTY channel instance. Multiple instances would each get a unique id.
pub struct PtyChannel {
    channel_id: String,
    state: Arc<CommsState>,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), state }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_pty(self.channel_id, self.state, shutdown))
    }
}

// ── Input parsing ────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum ConsoleInput<'a> {
    Skip,
    Help,
    Message { text: &'a str, quick_reply: bool },
}

fn parse_line(line: &str) -> ConsoleInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Skip;
    }
    match line.strip_prefix('/') {
        Some("help") | Some("?") => ConsoleInput::Help,
        Some(id) => ConsoleInput::Message { text: id.trim(), quick_reply: true },
        None => ConsoleInput::Message { text: line, quick_reply: false },
    }
}

fn help_text() -> String {
    let commands: Vec<String> = Category::QUICK_REPLIES
        .iter()
        .map(|c| format!("/{:<10}{}", c.id(), c.label()))
        .collect();
    format!("Quick replies:\n  {}\nOr just ask a question.", commands.join("\n  "))
}

// ── run_pty ──────────────────────────────────────────────────────────────────

async fn run_pty(
    channel_id: String,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let owner = state.engine().knowledge().owner.name.clone();
    let session = state.open_session(&channel_id);
    info!(%channel_id, %session, "pty channel started — type a question and press Enter. Ctrl-C to quit.");
    println!("─────────────────────────────────");
    println!(" Ask about {owner}  (/help, Ctrl-C to quit)");
    println!("─────────────────────────────────");

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        print!("> ");
        use std::io::Write as _;
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!("\n[pty] shutdown signal received — closing console channel");
                info!("pty channel shutting down");
                break;
            }

            line = lines.next_line() => {
                let input = match line {
                    Err(e) => {
                        warn!("pty read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => input,
                };

                match parse_line(&input) {
                    ConsoleInput::Skip => continue,
                    ConsoleInput::Help => println!("{}", help_text()),
                    ConsoleInput::Message { text, quick_reply } => {
                        debug!(input = %text, quick_reply, "pty received line");
                        let (_, outcome) =
                            state.send_message(&channel_id, Some(session), text, quick_reply).await;
                        println!("{}\n", markup::to_plain(&markup::segments(&outcome.text)));
                    }
                }
            }
        }
    }

    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse_line("   "), ConsoleInput::Skip);
    }

    #[test]
    fn slash_commands_are_quick_replies() {
        assert_eq!(parse_line("/work"), ConsoleInput::Message { text: "work", quick_reply: true });
        assert_eq!(parse_line(" /contact "), ConsoleInput::Message { text: "contact", quick_reply: true });
        assert_eq!(parse_line("/help"), ConsoleInput::Help);
    }

    #[test]
    fn plain_lines_are_free_text() {
        assert_eq!(
            parse_line("tell me about lane"),
            ConsoleInput::Message { text: "tell me about lane", quick_reply: false }
        );
    }

    #[test]
    fn help_lists_quick_replies() {
        let help = help_text();
        for c in Category::QUICK_REPLIES {
            assert!(help.contains(&format!("/{}", c.id())));
        }
    }
}
