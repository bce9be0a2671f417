//! Session lifecycle engine: owns the active conversation and mediates all
//! gateway and persistence calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::chat::core::config::AgentConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::UserId;
use crate::chat::core::message::ChatMessage;
use crate::chat::core::session::{ChatSession, new_session_id};
use crate::chat::engine::reveal;
use crate::chat::gateway::{AnswerGateway, AskRequest, BffGateway};
use crate::chat::history::{
    ConversationCache, ConversationStore, ConversationSummary, ListFilters,
    RemoteConversationStore,
};
use crate::chat::terms::{SqliteTermStore, TermService};

/// Assistant greeting seeded into every fresh session.
pub const WELCOME_MESSAGE: &str =
    "¡Hola! Soy tu asistente musical. Pregúntame sobre artistas, géneros o pide una recomendación.";

/// Shown in place of the answer when an exchange fails.
pub const APOLOGY_MESSAGE: &str =
    "Lo siento, ha ocurrido un error al procesar tu pregunta. Inténtalo de nuevo.";

/// Per-exchange state machine phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangePhase {
    /// No exchange in flight.
    Idle,
    /// Waiting for the gateway to answer.
    AwaitingGateway,
    /// Progressively revealing the answer.
    Revealing,
    /// The exchange completed and was handed to persistence.
    Completed,
    /// The exchange failed; the transcript carries the apology.
    Failed,
}

/// Observable snapshot of the active session.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    /// The active conversation.
    pub session: ChatSession,
    /// Current exchange phase.
    pub phase: ExchangePhase,
    /// Error from the last failed exchange, if any.
    pub last_error: Option<String>,
}

/// Outcome of a `send_message` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The exchange completed and was persisted.
    Completed {
        /// Session id the exchange ran under (possibly server-assigned).
        session_id: String,
    },
    /// Blank input, or an exchange was already pending.
    Ignored,
    /// The session was switched while the exchange was in flight.
    Cancelled,
    /// The gateway call failed; the transcript carries the apology.
    Failed {
        /// User-facing error description.
        error: String,
    },
}

/// Backend dependencies for the chat engine.
pub struct EngineDeps {
    /// AI gateway implementation.
    pub gateway: Arc<dyn AnswerGateway>,
    /// Remote conversation store implementation.
    pub store: Arc<dyn ConversationStore>,
    /// Local conversation cache.
    pub cache: Arc<ConversationCache>,
    /// Excluded-terms service.
    pub terms: Arc<TermService>,
}

impl EngineDeps {
    /// Build the default HTTP + `SQLite` backends from config.
    ///
    /// # Errors
    /// Returns an error if any backend cannot be initialized.
    pub async fn from_config(config: &AgentConfig) -> ChatResult<Self> {
        let gateway = Arc::new(BffGateway::new(&config.gateway)?);
        let store = Arc::new(RemoteConversationStore::new(&config.gateway)?);
        let cache = Arc::new(ConversationCache::new(&config.storage).await?);
        let terms = Arc::new(TermService::new(SqliteTermStore::new(&config.storage).await?));

        Ok(Self {
            gateway,
            store,
            cache,
            terms,
        })
    }
}

struct EngineState {
    session: ChatSession,
    phase: ExchangePhase,
    last_error: Option<String>,
}

/// Session lifecycle engine.
///
/// Exactly one session is active at a time. Consumers observe it through
/// [`subscribe`] and drive it through the async methods; all mutation goes
/// through the internal state lock, and an epoch counter bumped on every
/// session switch cancels stale in-flight work.
///
/// [`subscribe`]: ChatEngine::subscribe
pub struct ChatEngine {
    config: AgentConfig,
    user_id: UserId,
    gateway: Arc<dyn AnswerGateway>,
    store: Arc<dyn ConversationStore>,
    cache: Arc<ConversationCache>,
    terms: Arc<TermService>,
    state: Mutex<EngineState>,
    updates: watch::Sender<SessionSnapshot>,
    pending: AtomicBool,
    epoch: AtomicU64,
    initialized: AtomicBool,
}

impl ChatEngine {
    /// Create an engine for one user.
    ///
    /// The session starts empty; call [`initialize`] to seed the welcome
    /// message and a client-generated session id.
    ///
    /// [`initialize`]: ChatEngine::initialize
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: AgentConfig, user_id: UserId, deps: EngineDeps) -> ChatResult<Self> {
        config.validate()?;

        let session = ChatSession::new(String::new());
        let (updates, _) = watch::channel(SessionSnapshot {
            session: session.clone(),
            phase: ExchangePhase::Idle,
            last_error: None,
        });

        Ok(Self {
            config,
            user_id,
            gateway: deps.gateway,
            store: deps.store,
            cache: deps.cache,
            terms: deps.terms,
            state: Mutex::new(EngineState {
                session,
                phase: ExchangePhase::Idle,
                last_error: None,
            }),
            updates,
            pending: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
        })
    }

    /// Subscribe to session snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Seed a fresh session with a welcome message. One-shot: repeat calls
    /// are no-ops, so re-renders cannot reset the conversation.
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        self.reset_session().await;
    }

    /// Submit a user message and run the full exchange.
    ///
    /// Blank input and calls made while another exchange is pending are
    /// ignored. All failures are folded into the returned outcome; the
    /// transcript is updated before this returns.
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return SendOutcome::Ignored;
        }
        if self.pending.swap(true, Ordering::SeqCst) {
            debug!("exchange already pending; ignoring send");
            return SendOutcome::Ignored;
        }

        let outcome = self.run_exchange(trimmed).await;
        self.pending.store(false, Ordering::SeqCst);
        outcome
    }

    /// Replace the active session with a stored conversation.
    ///
    /// Reads the local cache first and falls back to the remote store.
    /// Cancels any in-flight exchange.
    ///
    /// # Errors
    /// Returns `ChatError::NotFound` when neither side knows the id, or a
    /// storage/transport error.
    #[instrument(skip(self))]
    pub async fn load_conversation(&self, session_id: &str) -> ChatResult<()> {
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let cached = match self.cache.get(session_id).await {
            Ok(found) => found,
            Err(err) => {
                warn!(error = %err, "cache read failed; falling back to remote store");
                None
            }
        };
        let session = match cached {
            Some(session) => session,
            None => self
                .store
                .get(session_id)
                .await?
                .ok_or_else(|| ChatError::NotFound(format!("conversation {session_id}")))?,
        };

        let mut state = self.state.lock().await;
        state.session = session;
        state.phase = ExchangePhase::Idle;
        state.last_error = None;
        self.publish(&state);
        info!(session = %state.session.id, "conversation loaded");
        Ok(())
    }

    /// Discard the active session and start a fresh one.
    ///
    /// The outgoing session is saved fire-and-forget; any in-flight
    /// exchange is cancelled.
    #[instrument(skip(self))]
    pub async fn start_new_chat(&self) {
        let outgoing = {
            let state = self.state.lock().await;
            state.session.clone()
        };

        if outgoing.has_user_messages() {
            let store = Arc::clone(&self.store);
            let cache = Arc::clone(&self.cache);
            let user_id = self.user_id.clone();
            tokio::spawn(async move {
                if let Err(err) = store.save(&user_id, &outgoing).await {
                    warn!(error = %err, "outgoing session remote save failed");
                }
                if let Err(err) = cache.save(&user_id, &outgoing).await {
                    warn!(error = %err, "outgoing session cache save failed");
                }
            });
        }

        self.reset_session().await;
    }

    /// List the user's conversations from the local cache.
    ///
    /// Falls back to the remote store when the cache is unreadable.
    ///
    /// # Errors
    /// Returns a storage or transport error if both sides fail.
    pub async fn list_conversations(
        &self,
        filters: &ListFilters,
    ) -> ChatResult<Vec<ConversationSummary>> {
        match self.cache.list(&self.user_id, filters).await {
            Ok(summaries) => Ok(summaries),
            Err(err) => {
                warn!(error = %err, "cache list failed; falling back to remote store");
                self.store.list(&self.user_id).await
            }
        }
    }

    /// Delete a conversation from both the remote store and the cache.
    ///
    /// # Errors
    /// Returns `ChatError::NotFound` when neither side knew the id, or the
    /// remote error when the remote delete failed and no local copy existed.
    #[instrument(skip(self))]
    pub async fn delete_conversation(&self, session_id: &str) -> ChatResult<()> {
        let local = self.cache.delete(session_id).await;
        let remote = self.store.delete(session_id).await;

        match (local, remote) {
            (_, Ok(())) | (Ok(()), Err(ChatError::NotFound(_))) => Ok(()),
            (Ok(()), Err(err)) => {
                warn!(error = %err, "remote delete failed; local copy removed");
                Ok(())
            }
            (Err(_), Err(err)) => Err(err),
        }
    }

    async fn reset_session(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let id = new_session_id();
        let mut session = ChatSession::new(id.clone());
        session.push_message(ChatMessage::assistant(WELCOME_MESSAGE, Some(id)));

        let mut state = self.state.lock().await;
        state.session = session;
        state.phase = ExchangePhase::Idle;
        state.last_error = None;
        self.publish(&state);
    }

    async fn run_exchange(&self, text: &str) -> SendOutcome {
        let epoch = self.epoch.load(Ordering::SeqCst);

        let outgoing = match self.terms.filter_text(&self.user_id, text).await {
            Ok(filtered) => filtered.text,
            Err(err) => {
                warn!(error = %err, "term filter unavailable; sending text as-is");
                text.to_string()
            }
        };

        let (placeholder_id, request_session_id) = {
            let mut state = self.state.lock().await;
            let session_id = non_empty(state.session.id.clone());

            state
                .session
                .push_message(ChatMessage::user(outgoing.clone(), session_id.clone()));
            let placeholder = ChatMessage::assistant_placeholder(session_id.clone());
            let placeholder_id = placeholder.id;
            state.session.push_message(placeholder);

            state.phase = ExchangePhase::AwaitingGateway;
            state.last_error = None;
            self.publish(&state);
            (placeholder_id, session_id)
        };

        let request = AskRequest {
            session_id: request_session_id,
            question: outgoing,
            model: self.config.gateway.model.clone(),
            user_id: self.user_id.to_string(),
            include_context: self.config.gateway.include_context,
        };

        let reply = self.gateway.ask(&request).await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("exchange abandoned after session switch");
            return SendOutcome::Cancelled;
        }

        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                let error = err.to_string();
                let mut state = self.state.lock().await;
                if let Some(message) = state
                    .session
                    .messages
                    .iter_mut()
                    .find(|m| m.id == placeholder_id)
                {
                    message.text = APOLOGY_MESSAGE.to_string();
                }
                state.phase = ExchangePhase::Failed;
                state.last_error = Some(error.clone());
                self.publish(&state);
                warn!(error = %error, "exchange failed");
                return SendOutcome::Failed { error };
            }
        };

        let incoming = match self.terms.filter_text(&self.user_id, &reply.text).await {
            Ok(filtered) => filtered.text,
            Err(err) => {
                warn!(error = %err, "term filter unavailable; revealing text as-is");
                reply.text.clone()
            }
        };

        {
            let mut state = self.state.lock().await;
            if state.session.id != reply.session_id {
                state.session.id.clone_from(&reply.session_id);
                for message in &mut state.session.messages {
                    message.session_id = Some(reply.session_id.clone());
                }
            }
            state.phase = ExchangePhase::Revealing;
            self.publish(&state);
        }

        for chunk in reveal::chunk_text(&incoming, &self.config.reveal) {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!("reveal abandoned after session switch");
                return SendOutcome::Cancelled;
            }
            {
                let mut state = self.state.lock().await;
                if let Some(message) = state
                    .session
                    .messages
                    .iter_mut()
                    .find(|m| m.id == placeholder_id)
                {
                    message.text.push_str(&chunk);
                }
                self.publish(&state);
            }
            tokio::time::sleep(reveal::chunk_delay(&chunk, &self.config.reveal)).await;
        }

        if self.epoch.load(Ordering::SeqCst) != epoch {
            return SendOutcome::Cancelled;
        }

        let completed = {
            let mut state = self.state.lock().await;
            state.session.updated_at = Utc::now();
            state.phase = ExchangePhase::Completed;
            self.publish(&state);
            state.session.clone()
        };

        self.persist(&completed).await;

        {
            let mut state = self.state.lock().await;
            if self.epoch.load(Ordering::SeqCst) == epoch {
                state.phase = ExchangePhase::Idle;
                self.publish(&state);
            }
        }

        SendOutcome::Completed {
            session_id: completed.id,
        }
    }

    async fn persist(&self, session: &ChatSession) {
        if let Err(err) = self.store.save(&self.user_id, session).await {
            warn!(error = %err, "remote save failed; keeping local copy only");
        }
        if let Err(err) = self.cache.save(&self.user_id, session).await {
            warn!(error = %err, "local cache save failed");
        }
    }

    fn publish(&self, state: &EngineState) {
        self.updates.send_replace(SessionSnapshot {
            session: state.session.clone(),
            phase: state.phase,
            last_error: state.last_error.clone(),
        });
    }
}

fn non_empty(id: String) -> Option<String> {
    if id.is_empty() { None } else { Some(id) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex as StdMutex, OnceLock};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::chat::core::config::RevealConfig;
    use crate::chat::core::message::Sender;
    use crate::chat::gateway::AskReply;
    use crate::chat::terms::TermCategory;

    struct FakeGateway {
        reply_text: String,
        session_id: String,
        fail: bool,
        delay: Duration,
        seen: StdMutex<Vec<AskRequest>>,
        observed: StdMutex<Option<(usize, usize, bool)>>,
        snapshots: OnceLock<watch::Receiver<SessionSnapshot>>,
    }

    impl FakeGateway {
        fn build(text: &str, session_id: &str, fail: bool, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply_text: text.to_string(),
                session_id: session_id.to_string(),
                fail,
                delay,
                seen: StdMutex::new(Vec::new()),
                observed: StdMutex::new(None),
                snapshots: OnceLock::new(),
            })
        }

        fn answering(text: &str, session_id: &str) -> Arc<Self> {
            Self::build(text, session_id, false, Duration::ZERO)
        }

        fn failing() -> Arc<Self> {
            Self::build("", "s", true, Duration::ZERO)
        }

        fn slow(text: &str, session_id: &str, delay: Duration) -> Arc<Self> {
            Self::build(text, session_id, false, delay)
        }

        fn watch(&self, receiver: watch::Receiver<SessionSnapshot>) {
            let _ = self.snapshots.set(receiver);
        }

        fn requests(&self) -> Vec<AskRequest> {
            self.seen.lock().expect("seen lock").clone()
        }
    }

    #[async_trait]
    impl AnswerGateway for FakeGateway {
        async fn ask(&self, request: &AskRequest) -> ChatResult<AskReply> {
            self.seen.lock().expect("seen lock").push(request.clone());

            if let Some(rx) = self.snapshots.get() {
                let snapshot = rx.borrow().clone();
                let users = snapshot
                    .session
                    .messages
                    .iter()
                    .filter(|m| m.sender == Sender::User)
                    .count();
                let assistants = snapshot
                    .session
                    .messages
                    .iter()
                    .filter(|m| m.sender == Sender::Assistant)
                    .count();
                let placeholder_empty = snapshot
                    .session
                    .messages
                    .last()
                    .is_some_and(ChatMessage::is_empty);
                *self.observed.lock().expect("observed lock") =
                    Some((users, assistants, placeholder_empty));
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(ChatError::HttpStatus(500));
            }
            Ok(AskReply {
                text: self.reply_text.clone(),
                session_id: self.session_id.clone(),
            })
        }
    }

    #[derive(Default)]
    struct FakeStore {
        saves: StdMutex<Vec<(UserId, ChatSession)>>,
    }

    impl FakeStore {
        fn saved(&self) -> Vec<(UserId, ChatSession)> {
            self.saves.lock().expect("saves lock").clone()
        }
    }

    #[async_trait]
    impl ConversationStore for FakeStore {
        async fn list(&self, _user_id: &UserId) -> ChatResult<Vec<ConversationSummary>> {
            Ok(Vec::new())
        }

        async fn get(&self, _session_id: &str) -> ChatResult<Option<ChatSession>> {
            Ok(None)
        }

        async fn save(&self, user_id: &UserId, session: &ChatSession) -> ChatResult<()> {
            self.saves
                .lock()
                .expect("saves lock")
                .push((user_id.clone(), session.clone()));
            Ok(())
        }

        async fn delete(&self, session_id: &str) -> ChatResult<()> {
            Err(ChatError::NotFound(format!("conversation {session_id}")))
        }
    }

    fn test_config() -> AgentConfig {
        AgentConfig {
            reveal: RevealConfig {
                max_chunk_chars: 8,
                millis_per_char: 0,
                min_delay_ms: 0,
                max_delay_ms: 0,
            },
            ..AgentConfig::default()
        }
    }

    async fn build_engine(
        gateway: Arc<FakeGateway>,
    ) -> (Arc<ChatEngine>, Arc<FakeStore>, Arc<TermService>) {
        let store = Arc::new(FakeStore::default());
        let cache = Arc::new(ConversationCache::open_in_memory().await.expect("cache"));
        let terms = Arc::new(TermService::new(
            SqliteTermStore::open_in_memory().await.expect("terms"),
        ));
        let deps = EngineDeps {
            gateway: Arc::clone(&gateway) as Arc<dyn AnswerGateway>,
            store: Arc::clone(&store) as Arc<dyn ConversationStore>,
            cache,
            terms: Arc::clone(&terms),
        };
        let engine = Arc::new(
            ChatEngine::new(
                test_config(),
                UserId::new("engine-tester").expect("user id"),
                deps,
            )
            .expect("engine"),
        );
        gateway.watch(engine.subscribe());
        (engine, store, terms)
    }

    #[tokio::test]
    async fn user_and_placeholder_appear_before_the_gateway_resolves() {
        let gateway = FakeGateway::answering("una respuesta", "srv-1");
        let (engine, _, _) = build_engine(Arc::clone(&gateway)).await;
        engine.initialize().await;

        engine.send_message("¿Qué es el jazz fusion?").await;

        let observed = *gateway.observed.lock().expect("observed lock");
        let (users, assistants, placeholder_empty) = observed.expect("gateway was called");
        assert_eq!(users, 1);
        assert_eq!(assistants, 2); // welcome + placeholder
        assert!(placeholder_empty);
    }

    #[tokio::test]
    async fn blank_input_is_ignored_without_state_changes() {
        let gateway = FakeGateway::answering("respuesta", "srv-1");
        let (engine, _, _) = build_engine(Arc::clone(&gateway)).await;
        engine.initialize().await;

        assert_eq!(engine.send_message("   \n\t ").await, SendOutcome::Ignored);
        assert!(gateway.requests().is_empty());

        let snapshot = engine.subscribe().borrow().clone();
        assert_eq!(snapshot.session.messages.len(), 1); // welcome only
    }

    #[tokio::test]
    async fn a_second_send_while_pending_is_ignored() {
        let gateway = FakeGateway::slow("respuesta", "srv-1", Duration::from_millis(150));
        let (engine, _, _) = build_engine(Arc::clone(&gateway)).await;
        engine.initialize().await;

        let first = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.send_message("primera pregunta").await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(
            engine.send_message("segunda pregunta").await,
            SendOutcome::Ignored
        );
        assert!(matches!(
            first.await.expect("join"),
            SendOutcome::Completed { .. }
        ));
        assert_eq!(gateway.requests().len(), 1);
    }

    #[tokio::test]
    async fn completed_exchange_reveals_everything_and_persists() {
        let answer = "El jazz fusion mezcla la improvisación del jazz con el rock.";
        let gateway = FakeGateway::answering(answer, "srv-42");
        let (engine, store, _) = build_engine(Arc::clone(&gateway)).await;
        engine.initialize().await;

        let outcome = engine.send_message("¿Qué es el jazz fusion?").await;
        assert_eq!(
            outcome,
            SendOutcome::Completed {
                session_id: "srv-42".to_string()
            }
        );

        let snapshot = engine.subscribe().borrow().clone();
        assert_eq!(snapshot.phase, ExchangePhase::Idle);
        assert_eq!(snapshot.session.id, "srv-42");
        let last = snapshot.session.messages.last().expect("placeholder");
        assert_eq!(last.text, answer);

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].1.id, "srv-42");
    }

    #[tokio::test]
    async fn empty_session_id_is_omitted_and_the_assigned_id_is_reused() {
        let gateway = FakeGateway::answering("claro", "srv-7");
        let (engine, store, _) = build_engine(Arc::clone(&gateway)).await;
        // No initialize: the session id starts empty.

        let outcome = engine.send_message("¿Qué es el jazz fusion?").await;
        assert_eq!(
            outcome,
            SendOutcome::Completed {
                session_id: "srv-7".to_string()
            }
        );

        let requests = gateway.requests();
        assert_eq!(requests[0].session_id, None);

        let saved = store.saved();
        assert_eq!(saved[0].1.id, "srv-7");
        assert!(!saved[0].1.id.is_empty());
    }

    #[tokio::test]
    async fn failed_exchange_leaves_the_apology_in_the_transcript() {
        let gateway = FakeGateway::failing();
        let (engine, store, _) = build_engine(Arc::clone(&gateway)).await;
        engine.initialize().await;

        let outcome = engine.send_message("algo de salsa").await;
        assert!(matches!(outcome, SendOutcome::Failed { .. }));

        let snapshot = engine.subscribe().borrow().clone();
        assert_eq!(snapshot.phase, ExchangePhase::Failed);
        assert!(snapshot.last_error.is_some());
        let last = snapshot.session.messages.last().expect("placeholder");
        assert_eq!(last.text, APOLOGY_MESSAGE);
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn starting_a_new_chat_cancels_the_inflight_exchange() {
        let gateway = FakeGateway::slow("respuesta tardía", "srv-9", Duration::from_millis(150));
        let (engine, _, _) = build_engine(Arc::clone(&gateway)).await;
        engine.initialize().await;

        let first = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.send_message("pregunta abandonada").await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        engine.start_new_chat().await;
        assert_eq!(first.await.expect("join"), SendOutcome::Cancelled);

        let snapshot = engine.subscribe().borrow().clone();
        assert_eq!(snapshot.session.messages.len(), 1); // fresh welcome only
        assert_eq!(snapshot.phase, ExchangePhase::Idle);
    }

    #[tokio::test]
    async fn initialize_is_one_shot() {
        let gateway = FakeGateway::answering("respuesta", "srv-1");
        let (engine, _, _) = build_engine(gateway).await;

        engine.initialize().await;
        let first_id = engine.subscribe().borrow().session.id.clone();
        assert!(!first_id.is_empty());

        engine.initialize().await;
        assert_eq!(engine.subscribe().borrow().session.id, first_id);
    }

    #[tokio::test]
    async fn load_conversation_prefers_the_cache_and_reports_missing_ids() {
        let gateway = FakeGateway::answering("respuesta", "srv-1");
        let (engine, _, _) = build_engine(gateway).await;
        engine.initialize().await;

        let mut stored = ChatSession::new("s-previa");
        stored.push_message(ChatMessage::user(
            "recomiéndame boleros",
            Some("s-previa".to_string()),
        ));
        engine
            .cache
            .save(&UserId::new("engine-tester").expect("user id"), &stored)
            .await
            .expect("seed cache");

        engine.load_conversation("s-previa").await.expect("load");
        let snapshot = engine.subscribe().borrow().clone();
        assert_eq!(snapshot.session, stored);

        let missing = engine.load_conversation("s-inexistente").await;
        assert!(matches!(missing, Err(ChatError::NotFound(_))));
    }

    #[tokio::test]
    async fn outgoing_text_is_redacted_before_reaching_the_gateway() {
        let gateway = FakeGateway::answering("mejor algo de jazz", "srv-1");
        let (engine, _, terms) = build_engine(Arc::clone(&gateway)).await;
        engine.initialize().await;

        terms
            .add(
                &UserId::new("engine-tester").expect("user id"),
                "reggaeton",
                TermCategory::Genre,
                None,
            )
            .await
            .expect("add term");

        engine.send_message("quiero reggaeton pero no sé").await;
        let requests = gateway.requests();
        assert_eq!(requests[0].question, "quiero pero no sé");
    }
}
