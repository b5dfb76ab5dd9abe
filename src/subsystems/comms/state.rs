//! Shared state for the comms subsystem — capability boundary for channels.
//!
//! Channels receive an `Arc<CommsState>` and are restricted to the typed
//! methods below. Sessions are keyed by a v4 [`Uuid`]; each session's
//! [`Conversation`] sits behind its own async mutex so concurrent requests for
//! one session are answered strictly in order while other sessions proceed.
//! The session map is bounded: past `max_sessions` the least recently used
//! session is dropped, and a session whose history fills up starts over.
//!
//! # Intra-subsystem events
//!
//! [`CommsState::report_event`] lets a running channel signal the comms
//! subsystem manager (e.g. "I shut down", "new session started") without a
//! direct handle on it. The manager owns the receiver end.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chat::{ChatEngine, Conversation};
use crate::llm::dispatch::ReplyOutcome;

// ── Events ────────────────────────────────────────────────────────────────────

/// Events a channel sends back to the comms subsystem manager.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped (clean exit or EOF).
    ChannelShutdown { channel_id: String },
    /// A new conversation was opened on the channel.
    SessionStarted { channel_id: String, session_id: Uuid },
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Sessions kept before the least recently used one is dropped.
pub const DEFAULT_MAX_SESSIONS: usize = 512;

/// History entries (user + assistant) after which a session starts over.
pub const DEFAULT_MAX_SESSION_TURNS: usize = 200;

type SessionHandle = Arc<AsyncMutex<Conversation>>;

struct SessionEntry {
    handle: SessionHandle,
    /// Value of `Sessions::clock` at the last lookup.
    last_used: u64,
}

#[derive(Default)]
struct Sessions {
    entries: HashMap<Uuid, SessionEntry>,
    clock: u64,
}

impl Sessions {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Drop least recently used sessions until one more fits under `max`.
    fn make_room(&mut self, max: usize) -> Vec<Uuid> {
        let mut evicted = Vec::new();
        while !self.entries.is_empty() && self.entries.len() >= max {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| *id)
            else {
                break;
            };
            self.entries.remove(&oldest);
            evicted.push(oldest);
        }
        evicted
    }
}

/// Shared state passed as `Arc<CommsState>` to every channel task.
pub struct CommsState {
    engine: Arc<ChatEngine>,
    sessions: Mutex<Sessions>,
    max_sessions: usize,
    max_session_turns: usize,
    /// Back-channel to the comms subsystem manager.
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(engine: Arc<ChatEngine>, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        Self::with_limits(engine, event_tx, DEFAULT_MAX_SESSIONS, DEFAULT_MAX_SESSION_TURNS)
    }

    /// Like [`CommsState::new`] with explicit session limits. Zero limits are
    /// raised to one.
    pub fn with_limits(
        engine: Arc<ChatEngine>,
        event_tx: mpsc::Sender<CommsEvent>,
        max_sessions: usize,
        max_session_turns: usize,
    ) -> Self {
        Self {
            engine,
            sessions: Mutex::new(Sessions::default()),
            max_sessions: max_sessions.max(1),
            max_session_turns: max_session_turns.max(1),
            event_tx,
        }
    }

    pub fn engine(&self) -> &ChatEngine {
        &self.engine
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().entries.len()
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, Sessions> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Open a fresh conversation and return its id.
    pub fn open_session(&self, channel_id: &str) -> Uuid {
        let (id, _) = self.session(channel_id, None);
        id
    }

    /// Look up `id`, creating a new session when it is `None` or unknown.
    /// Creating a session past the cap evicts the least recently used one.
    fn session(&self, channel_id: &str, id: Option<Uuid>) -> (Uuid, SessionHandle) {
        let mut sessions = self.lock_sessions();
        let now = sessions.tick();
        if let Some(id) = id {
            if let Some(entry) = sessions.entries.get_mut(&id) {
                entry.last_used = now;
                return (id, Arc::clone(&entry.handle));
            }
        }

        let evicted = sessions.make_room(self.max_sessions);
        let id = id.unwrap_or_else(Uuid::new_v4);
        let handle = Arc::new(AsyncMutex::new(Conversation::new(Arc::clone(&self.engine))));
        sessions.entries.insert(id, SessionEntry { handle: Arc::clone(&handle), last_used: now });
        drop(sessions);

        for old in evicted {
            debug!(%channel_id, session_id = %old, "evicted idle session");
        }
        self.report_event(CommsEvent::SessionStarted {
            channel_id: channel_id.to_string(),
            session_id: id,
        });
        (id, handle)
    }

    /// Run one turn in session `session_id` (created on demand) and return
    /// the session id with the reply.
    ///
    /// This is the primary path for all comms channels. Channels do not
    /// need to know about engines or dispatchers. A session whose history
    /// has reached the turn limit starts over with an empty conversation.
    pub async fn send_message(
        &self,
        channel_id: &str,
        session_id: Option<Uuid>,
        text: &str,
        quick_reply: bool,
    ) -> (Uuid, ReplyOutcome) {
        let (id, handle) = self.session(channel_id, session_id);
        let mut conversation = handle.lock().await;
        if conversation.history().len() >= self.max_session_turns {
            debug!(%channel_id, session_id = %id, "session history full, starting over");
            *conversation = Conversation::new(Arc::clone(&self.engine));
        }
        let outcome = conversation.exchange(text, quick_reply).await;
        (id, outcome)
    }

    /// Number of turns recorded for `session_id`, if it exists.
    pub async fn history_len(&self, session_id: Uuid) -> Option<usize> {
        let handle = {
            let sessions = self.lock_sessions();
            Arc::clone(&sessions.entries.get(&session_id)?.handle)
        };
        let conversation = handle.lock().await;
        Some(conversation.history().len())
    }

    /// Report an event to the comms subsystem manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is not
    /// keeping up (channel full) or has already exited (closed).
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}
