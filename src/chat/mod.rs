//! Response orchestration — decides, per turn, whether a reply comes from a
//! canned answer, the local resolver, or the remote provider.
//!
//! [`ChatEngine`] is shared by every session and holds everything derived
//! from the knowledge base. [`Conversation`] owns one session's transcript;
//! `submit` takes `&mut self`, so turns within a session never overlap.
//!
//! Decision table, evaluated in order by [`ChatEngine::plan`]:
//!
//! ```text
//! quick reply naming a category  → canned answer            (QuickReply)
//! remote configured              → dispatch, else local      (Remote)
//! high-confidence keyword        → local candidate           (LocalShortcut)
//! otherwise                      → local candidate / help    (Local)
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{self, ContextBundle};
use crate::intent::rules::SHORTCUT_RE;
use crate::intent::{Category, IntentResolver};
use crate::knowledge::KnowledgeBase;
use crate::llm::ConversationTurn;
use crate::llm::dispatch::{Dispatcher, ReplyOutcome};
use crate::reply::{self, CannedAnswers};

/// How a turn will be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    QuickReply(Category),
    Remote,
    LocalShortcut,
    Local,
}

// ── ChatEngine ────────────────────────────────────────────────────────────────

pub struct ChatEngine {
    knowledge: Arc<KnowledgeBase>,
    canned: CannedAnswers,
    context: ContextBundle,
    dispatcher: Option<Dispatcher>,
}

impl ChatEngine {
    /// Precompute canned answers and the context bundle for `knowledge`.
    /// `dispatcher` is `None` when no remote provider is configured.
    pub fn new(knowledge: Arc<KnowledgeBase>, dispatcher: Option<Dispatcher>) -> Self {
        let canned = CannedAnswers::build(&knowledge);
        let context = context::serialize(&knowledge);
        Self { knowledge, canned, context, dispatcher }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn context(&self) -> &ContextBundle {
        &self.context
    }

    pub fn remote_configured(&self) -> bool {
        self.dispatcher.is_some()
    }

    pub fn canned(&self, category: Category) -> &str {
        self.canned.get(category)
    }

    /// Local resolver answer for `text`; the help text when nothing matches.
    pub fn local_reply(&self, text: &str) -> String {
        let result = IntentResolver::new(&self.knowledge).resolve(text);
        reply::format(&result, &self.canned)
    }

    pub fn plan(&self, text: &str, quick_reply: bool) -> Route {
        if quick_reply {
            if let Some(category) = Category::from_id(text) {
                return Route::QuickReply(category);
            }
            debug!(id = %text, "unrecognised quick reply, treating as free text");
        }
        if self.dispatcher.is_some() {
            Route::Remote
        } else if SHORTCUT_RE.is_match(text) {
            Route::LocalShortcut
        } else {
            Route::Local
        }
    }

    /// Answer `text` given the prior `history` of this conversation. Always
    /// produces a reply.
    pub async fn respond(
        &self,
        history: &[ConversationTurn],
        text: &str,
        quick_reply: bool,
    ) -> ReplyOutcome {
        let route = self.plan(text, quick_reply);
        debug!(?route, "turn planned");

        if let Route::QuickReply(category) = route {
            return ReplyOutcome::local(self.canned.get(category));
        }

        let local = self.local_reply(text);
        match (route, &self.dispatcher) {
            (Route::Remote, Some(dispatcher)) => {
                let mut turns = history.to_vec();
                turns.push(ConversationTurn::user(text));
                let outcome = dispatcher.dispatch(&turns, &self.context, dispatcher.timeout()).await;
                if outcome.ok {
                    outcome
                } else {
                    info!(provider = dispatcher.provider_name(), "falling back to local reply");
                    ReplyOutcome::local(local)
                }
            }
            _ => ReplyOutcome::local(local),
        }
    }
}

// ── Conversation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingReply,
    Resolved,
}

/// One chat session: an append-only transcript plus the turn state.
pub struct Conversation {
    engine: Arc<ChatEngine>,
    history: Vec<ConversationTurn>,
    state: TurnState,
}

impl Conversation {
    pub fn new(engine: Arc<ChatEngine>) -> Self {
        Self { engine, history: Vec::new(), state: TurnState::Idle }
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Run one turn and return the full outcome. Both the user turn and the
    /// reply are appended once the reply is known.
    ///
    /// For a quick reply `text` is the category id; the transcript records
    /// the button label instead.
    pub async fn exchange(&mut self, text: &str, quick_reply: bool) -> ReplyOutcome {
        self.state = TurnState::AwaitingReply;

        let outcome = self.engine.respond(&self.history, text, quick_reply).await;

        let user_content = match Category::from_id(text) {
            Some(category) if quick_reply => category.label().to_string(),
            _ => text.to_string(),
        };
        self.history.push(ConversationTurn::user(user_content));
        self.history.push(ConversationTurn::assistant(outcome.text.clone()));
        self.state = TurnState::Resolved;
        outcome
    }

    /// Run one turn and return the assistant's reply turn.
    pub async fn submit(&mut self, text: &str, quick_reply: bool) -> ConversationTurn {
        let outcome = self.exchange(text, quick_reply).await;
        ConversationTurn::assistant(outcome.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::llm::dispatch::{DEFAULT_TIMEOUT, ReplySource};
    use crate::llm::providers::dummy::{DummyBehaviour, DummyProvider};
    use crate::llm::{CompletionProvider, Role};

    fn kb() -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase::test_default())
    }

    fn local_engine() -> Arc<ChatEngine> {
        Arc::new(ChatEngine::new(kb(), None))
    }

    fn remote_engine(latency: Duration, behaviour: DummyBehaviour) -> Arc<ChatEngine> {
        let provider = CompletionProvider::Dummy(DummyProvider::new(latency, behaviour));
        Arc::new(ChatEngine::new(kb(), Some(Dispatcher::new(provider, DEFAULT_TIMEOUT))))
    }

    #[test]
    fn plan_follows_decision_table() {
        let local = local_engine();
        assert_eq!(local.plan("contact", true), Route::QuickReply(Category::Contact));
        assert_eq!(local.plan("lane", false), Route::LocalShortcut);
        assert_eq!(local.plan("all projects", false), Route::LocalShortcut);
        assert_eq!(local.plan("who is she", false), Route::Local);
        assert_eq!(local.plan("hobbies", true), Route::Local);

        let remote = remote_engine(Duration::ZERO, DummyBehaviour::Echo);
        assert_eq!(remote.plan("work", true), Route::QuickReply(Category::Work));
        assert_eq!(remote.plan("lane", false), Route::Remote);
    }

    #[tokio::test]
    async fn project_query_without_remote() {
        let mut convo = Conversation::new(local_engine());
        let turn = convo.submit("Tell me about Lane Detection", false).await;
        assert_eq!(turn.role, Role::Assistant);
        assert!(turn.content.contains("Lane Detection System"));
        for tag in ["ML", "PyTorch", "Computer Vision"] {
            assert!(turn.content.contains(tag));
        }
    }

    #[tokio::test]
    async fn contact_quick_reply_is_canned() {
        let engine = local_engine();
        let mut convo = Conversation::new(Arc::clone(&engine));
        let out = convo.exchange("contact", true).await;
        assert_eq!(out.text, engine.canned(Category::Contact));
        assert_eq!(out.source, ReplySource::Local);
        assert!(out.text.contains("ada@example.com"));
        assert!(out.text.contains("https://www.linkedin.com/in/ada-example/"));
        assert!(out.text.contains("https://github.com/ada-example"));
        assert_eq!(convo.history()[0].content, "Contact");
    }

    #[tokio::test]
    async fn quick_reply_skips_remote() {
        let engine = remote_engine(Duration::ZERO, DummyBehaviour::Echo);
        let out = engine.respond(&[], "skills", true).await;
        assert_eq!(out.source, ReplySource::Local);
        assert_eq!(out.text, engine.canned(Category::Skills));
    }

    #[tokio::test]
    async fn gibberish_gets_help() {
        let engine = local_engine();
        let out = engine.respond(&[], "zzqqxx", false).await;
        assert_eq!(out.text, engine.canned(Category::Unknown));
        for word in ["projects", "work", "education", "skills", "contact"] {
            assert!(out.text.contains(word));
        }
    }

    #[tokio::test]
    async fn remote_success_is_returned_unmodified() {
        let engine = remote_engine(Duration::ZERO, DummyBehaviour::Echo);
        let mut convo = Conversation::new(engine);
        let out = convo.exchange("what is she like?", false).await;
        assert_eq!(out, ReplyOutcome::remote("[echo] what is she like?"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_remote_falls_back_to_local_candidate() {
        let engine = remote_engine(Duration::from_secs(20), DummyBehaviour::Echo);
        let expected = engine.local_reply("lane detection");
        let out = engine.respond(&[], "lane detection", false).await;
        assert_eq!(out, ReplyOutcome::local(expected));
    }

    #[tokio::test]
    async fn failing_remote_falls_back_to_local_candidate() {
        let engine = remote_engine(Duration::ZERO, DummyBehaviour::Fail);
        let out = engine.respond(&[], "zzqqxx", false).await;
        assert_eq!(out.text, engine.canned(Category::Unknown));
        assert_eq!(out.source, ReplySource::Local);
    }

    #[tokio::test]
    async fn history_grows_two_turns_per_submit() {
        let mut convo = Conversation::new(local_engine());
        assert_eq!(convo.state(), TurnState::Idle);
        convo.submit("skills", false).await;
        convo.submit("work", true).await;
        assert_eq!(convo.state(), TurnState::Resolved);
        let roles: Vec<Role> = convo.history().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
        assert_eq!(convo.history()[0].content, "skills");
        assert_eq!(convo.history()[2].content, "Work");
    }

    #[tokio::test]
    async fn remote_sees_prior_history() {
        let mut convo = Conversation::new(remote_engine(Duration::ZERO, DummyBehaviour::Echo));
        convo.submit("first", false).await;
        let turn = convo.submit("second", false).await;
        assert_eq!(turn.content, "[echo] second");
        assert_eq!(convo.history().len(), 4);
        assert_eq!(convo.history()[1].content, "[echo] first");
    }
}
