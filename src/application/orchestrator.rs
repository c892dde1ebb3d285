//! Session orchestrator - drives one conversation session.
//!
//! Routes each utterance, talks to the agent, appends the visible reply and
//! then persists best-effort. Agent failures never escape: each one becomes
//! a single localized assistant message.
//!
//! # Concurrency
//!
//! Session state sits behind a mutex that is never held across an await.
//! At most one agent call runs per session (`loading`). Every reset bumps an
//! epoch; a reply that resolves under an older epoch is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use super::error::ConversationError;
use super::thread_repository::ThreadRepository;
use crate::domain::comparison::{metadata_snapshot, AgentReply, ComparisonContext, Evaluation};
use crate::domain::conversation::{thread_title, Locale, Message, NewThread, Thread, ThreadPatch};
use crate::domain::foundation::{ErrorCode, ThreadId, UserId, ValidationError};
use crate::domain::search::{DateRange, SearchContext, DEFAULT_NIGHTS};
use crate::domain::session::{Dispatch, DispatchTarget, IntentRouter, Mode, Session};
use crate::ports::{
    AgentError, AgentMessageRequest, AgentService, Clock, CompareRequest, HistoryStore,
    IdentityProvider, Notice, UserNotifier,
};

/// Longest thread title derived from a free-form first message.
const CHAT_TITLE_CHARS: usize = 40;

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub locale: Locale,
    /// Sent as `channel` with every comparison.
    pub channel: String,
    pub default_nights: u32,
    pub default_mode: Mode,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            locale: Locale::En,
            channel: "web".to_string(),
            default_nights: DEFAULT_NIGHTS,
            default_mode: Mode::Expert,
        }
    }
}

/// What a submit produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Messages appended to the transcript after the user's own message.
    Appended {
        target: DispatchTarget,
        messages: Vec<Message>,
    },
    /// The session was reset while the call was pending; nothing applied.
    Discarded,
}

impl SubmitOutcome {
    pub fn messages(&self) -> &[Message] {
        match self {
            SubmitOutcome::Appended { messages, .. } => messages,
            SubmitOutcome::Discarded => &[],
        }
    }
}

#[derive(Debug)]
struct SessionState {
    session: Session,
    epoch: u64,
    loading: bool,
}

/// Writes to perform after the visible state changed.
#[derive(Debug, Default)]
struct PersistPlan {
    messages: Vec<Message>,
    patch: Option<ThreadPatch>,
}

/// The session was reset while we were waiting.
struct Stale;

pub struct SessionOrchestrator {
    agent: Arc<dyn AgentService>,
    repository: Arc<ThreadRepository>,
    identity: Arc<dyn IdentityProvider>,
    history: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn UserNotifier>,
    router: IntentRouter,
    settings: OrchestratorSettings,
    state: Mutex<SessionState>,
}

impl SessionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: Arc<dyn AgentService>,
        repository: Arc<ThreadRepository>,
        identity: Arc<dyn IdentityProvider>,
        history: Arc<dyn HistoryStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn UserNotifier>,
        settings: OrchestratorSettings,
    ) -> Self {
        let session = Session::new(settings.default_mode);
        Self {
            agent,
            repository,
            identity,
            history,
            clock,
            notifier,
            router: IntentRouter::new(settings.default_nights),
            settings,
            state: Mutex::new(SessionState {
                session,
                epoch: 0,
                loading: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.lock().session.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn locale(&self) -> Locale {
        self.settings.locale
    }

    pub async fn recent_searches(&self) -> Result<Vec<String>, ConversationError> {
        Ok(self.history.recent_searches().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Search context editing
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_mode(&self, mode: Mode) -> Result<(), ConversationError> {
        Ok(self.lock().session.set_mode(mode)?)
    }

    pub fn set_hotel_name(&self, hotel_name: &str) -> Result<(), ConversationError> {
        let today = self.clock.today();
        let nights = self.settings.default_nights;
        Ok(self.lock().session.set_hotel_name(hotel_name, today, nights)?)
    }

    /// One calendar click.
    pub fn select_date(&self, click: NaiveDate) -> DateRange {
        let today = self.clock.today();
        self.lock().session.select_date(click, today)
    }

    pub fn set_guests(&self, rooms: u32, adults: u32, children: u32) -> Result<(), ConversationError> {
        Ok(self
            .lock()
            .session
            .search_context_mut()
            .set_guests(rooms, adults, children)?)
    }

    pub fn set_room_type(&self, room_type: &str) {
        self.lock()
            .session
            .search_context_mut()
            .set_room_type(room_type.trim());
    }

    pub fn set_preferences(&self, preferences: &str) {
        self.lock()
            .session
            .search_context_mut()
            .set_preferences(preferences.trim());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conversation
    // ─────────────────────────────────────────────────────────────────────────

    /// "New chat". Any pending reply is orphaned.
    pub fn new_chat(&self) {
        let mut state = self.lock();
        state.session.reset();
        state.epoch += 1;
        state.loading = false;
        tracing::info!(epoch = state.epoch, "Session reset");
    }

    /// Handles one user utterance.
    pub async fn submit(&self, utterance: &str) -> Result<SubmitOutcome, ConversationError> {
        let text = utterance.trim();
        if text.is_empty() {
            return Err(ValidationError::empty_field("utterance").into());
        }
        let user_id = self.identity.user_id().await?;
        let today = self.clock.today();

        let (dispatch, epoch, user_message) = {
            let mut state = self.lock();
            if state.loading {
                return Err(ConversationError::Busy);
            }

            let routed = self.router.route(text, &mut state.session, today);
            let user_message = Message::user(text);
            state.session.push_message(user_message.clone());

            match routed {
                Ok(dispatch) => {
                    state.loading = true;
                    (dispatch, state.epoch, user_message)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Utterance could not be routed");
                    let failure = Message::assistant(self.settings.locale.failure(ErrorCode::ValidationFailed));
                    state.session.push_message(failure.clone());
                    return Ok(SubmitOutcome::Appended {
                        target: DispatchTarget::Message,
                        messages: vec![failure],
                    });
                }
            }
        };
        tracing::info!(dispatch = ?dispatch.target(), epoch, "Utterance routed");

        if let Dispatch::Compare(params) = &dispatch {
            if let Err(err) = self.history.record_search(&params.hotel_name).await {
                tracing::warn!(error = %err, "Failed to record search history");
            }
        }

        let thread_id = match self.ensure_thread(&user_id, epoch, text).await {
            Ok(thread_id) => thread_id,
            Err(Stale) => return Ok(SubmitOutcome::Discarded),
        };
        self.persist(
            &user_id,
            thread_id.as_ref(),
            PersistPlan {
                messages: vec![user_message],
                patch: None,
            },
        )
        .await;

        let result = self.call_agent(&user_id, thread_id.as_ref(), &dispatch).await;
        self.finish(&user_id, thread_id.as_ref(), epoch, dispatch.target(), result)
            .await
    }

    /// Asks for the cheapest booking strategy of the evaluated hotel.
    pub async fn request_booking_strategy(&self) -> Result<SubmitOutcome, ConversationError> {
        let user_id = self.identity.user_id().await?;

        let (dispatch, epoch, thread_id) = {
            let mut state = self.lock();
            if state.loading {
                return Err(ConversationError::Busy);
            }
            let dispatch = self.router.booking_strategy(&state.session)?;
            state.session.lock_mode();
            state.loading = true;
            (dispatch, state.epoch, state.session.thread_id().cloned())
        };

        let result = self.call_agent(&user_id, thread_id.as_ref(), &dispatch).await;
        self.finish(&user_id, thread_id.as_ref(), epoch, dispatch.target(), result)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Threads
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn list_threads(&self) -> Result<Vec<Thread>, ConversationError> {
        let user_id = self.identity.user_id().await?;
        Ok(self.repository.list_threads(&user_id).await?)
    }

    /// Resumes a stored thread as the current session.
    pub async fn open_thread(&self, thread_id: &ThreadId) -> Result<(), ConversationError> {
        let user_id = self.identity.user_id().await?;
        let thread = self.repository.get_thread(&user_id, thread_id).await?;
        let messages = self.repository.list_messages(&user_id, thread_id).await?;

        let today = self.clock.today();
        let nights = self.settings.default_nights;
        let hotel_name = match thread.hotel_name.trim() {
            "" => thread
                .comparison_context()
                .map(|context| context.hotel_name)
                .unwrap_or_default(),
            name => name.to_string(),
        };
        let mut search = SearchContext::default();
        if !hotel_name.trim().is_empty() {
            search = SearchContext::for_hotel(hotel_name.trim(), today, nights);
            if let (Some(check_in), Some(check_out)) = (thread.check_in, thread.check_out) {
                search.apply_authoritative_dates(check_in, check_out);
            }
            search.confirm(today, nights)?;
        }

        let mut state = self.lock();
        let mode = state.session.mode();
        state.session = Session::resume(
            mode,
            thread.id.clone(),
            search,
            thread.hotel_id.clone(),
            messages,
            thread.has_comparison(),
        );
        state.epoch += 1;
        state.loading = false;
        tracing::info!(thread_id = %thread.id, phase = ?state.session.phase(), "Thread opened");
        Ok(())
    }

    /// Deletes a thread. Deleting the open thread also resets the session.
    pub async fn delete_thread(&self, thread_id: &ThreadId) -> Result<(), ConversationError> {
        let user_id = self.identity.user_id().await?;
        self.repository.delete_thread(&user_id, thread_id).await?;

        let is_active = self.lock().session.thread_id() == Some(thread_id);
        if is_active {
            self.new_chat();
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the session's thread, creating one on first dispatch. A failed
    /// create degrades to an unsaved conversation.
    async fn ensure_thread(
        &self,
        user_id: &UserId,
        epoch: u64,
        first_text: &str,
    ) -> Result<Option<ThreadId>, Stale> {
        let new_thread = {
            let state = self.lock();
            if state.epoch != epoch {
                return Err(Stale);
            }
            if let Some(thread_id) = state.session.thread_id() {
                return Ok(Some(thread_id.clone()));
            }
            new_thread_for(&state.session, first_text)
        };

        let created = self.repository.create_thread(user_id, new_thread).await;

        let orphan = {
            let mut state = self.lock();
            if state.epoch == epoch {
                return match created {
                    Ok(thread) => {
                        state.session.attach_thread(thread.id.clone());
                        Ok(Some(thread.id))
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to create thread, conversation will not be saved");
                        self.notifier.notify(Notice::PersistenceWarning);
                        Ok(None)
                    }
                };
            }
            tracing::warn!(epoch, current = state.epoch, "Session reset while creating thread");
            created.ok()
        };

        // The reset session never saw this thread; don't leave it empty in the list.
        if let Some(thread) = orphan {
            if let Err(err) = self.repository.discard_thread(user_id, &thread.id).await {
                tracing::warn!(thread_id = %thread.id, error = %err, "Failed to remove abandoned thread");
            }
        }
        Err(Stale)
    }

    async fn call_agent(
        &self,
        user_id: &UserId,
        thread_id: Option<&ThreadId>,
        dispatch: &Dispatch,
    ) -> Result<AgentReply, AgentError> {
        match dispatch {
            Dispatch::Message { text } => {
                let context = match thread_id {
                    Some(thread_id) => self.follow_up_context(user_id, thread_id).await,
                    None => None,
                };
                let request = AgentMessageRequest::new(user_id.clone(), text.clone()).with_context(context);
                self.agent.send_message(request).await?.interpret()
            }
            Dispatch::Compare(params) => {
                let request = CompareRequest {
                    user_id: user_id.clone(),
                    params: params.clone(),
                    timestamp: self.clock.now(),
                    channel: self.settings.channel.clone(),
                };
                self.agent.compare(request).await?.interpret()
            }
            Dispatch::BookingStrategy(query) => {
                let reply = self.agent.booking_strategy(query.clone()).await?;
                if reply.reply.trim().is_empty() {
                    Ok(AgentReply::Pending)
                } else {
                    Ok(AgentReply::Text(reply.reply))
                }
            }
        }
    }

    async fn follow_up_context(&self, user_id: &UserId, thread_id: &ThreadId) -> Option<ComparisonContext> {
        match self.repository.comparison_context(user_id, thread_id).await {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!(thread_id = %thread_id, error = %err, "Comparison context unavailable");
                None
            }
        }
    }

    /// Applies an agent result if the session has not been reset meanwhile.
    async fn finish(
        &self,
        user_id: &UserId,
        thread_id: Option<&ThreadId>,
        epoch: u64,
        target: DispatchTarget,
        result: Result<AgentReply, AgentError>,
    ) -> Result<SubmitOutcome, ConversationError> {
        let (messages, plan) = {
            let mut state = self.lock();
            if state.epoch != epoch {
                tracing::warn!(epoch, current = state.epoch, "Discarding stale agent response");
                return Ok(SubmitOutcome::Discarded);
            }
            let applied = self.apply_reply(&mut state.session, result);
            state.loading = false;
            applied
        };

        self.persist(user_id, thread_id, plan).await;
        Ok(SubmitOutcome::Appended { target, messages })
    }

    fn apply_reply(
        &self,
        session: &mut Session,
        result: Result<AgentReply, AgentError>,
    ) -> (Vec<Message>, PersistPlan) {
        let locale = self.settings.locale;
        let mut appended = Vec::new();
        let mut plan = PersistPlan::default();

        match result {
            Ok(AgentReply::Pending) => {
                tracing::debug!("Agent reply buffered");
                appended.push(Message::system(locale.still_processing()));
            }
            Ok(AgentReply::Text(text)) => {
                appended.push(Message::assistant(text));
                plan.messages = appended.clone();
            }
            Ok(AgentReply::Evaluation(evaluation)) if evaluation.has_rates() => {
                if let Some((check_in, check_out)) = evaluation.stay_dates() {
                    if session.search_context().is_confirmed() {
                        session
                            .search_context_mut()
                            .apply_authoritative_dates(check_in, check_out);
                    }
                }
                session.mark_evaluated(evaluation.hotel_id.clone());
                tracing::info!(
                    hotel = %evaluation.hotel_name,
                    rows = evaluation.table_rows.len(),
                    "Comparison received"
                );

                plan.patch = Some(self.comparison_patch(session, &evaluation));
                let analysis = evaluation
                    .narrative()
                    .map(|text| format!("{}\n\n{}", locale.deep_analysis_heading(), text));
                appended.push(Message::comparison(evaluation));
                if let Some(analysis) = analysis {
                    appended.push(Message::assistant(analysis));
                }
                plan.messages = appended.clone();
            }
            Ok(AgentReply::Evaluation(evaluation)) => {
                let hotel = if evaluation.hotel_name.trim().is_empty() {
                    session.search_context().hotel_name().to_string()
                } else {
                    evaluation.hotel_name.clone()
                };
                tracing::info!(hotel = %hotel, "Comparison returned no rates");
                appended.push(Message::assistant(locale.no_rates_found(&hotel)));
                plan.messages = appended.clone();
            }
            Err(err) => {
                tracing::warn!(error = %err, code = %err.code(), "Agent call failed");
                appended.push(Message::assistant(locale.failure(err.code())));
            }
        }

        for message in &appended {
            session.push_message(message.clone());
        }
        (appended, plan)
    }

    fn comparison_patch(&self, session: &Session, evaluation: &Evaluation) -> ThreadPatch {
        let search = session.search_context();
        let title = search
            .has_hotel()
            .then(|| thread_title(search.hotel_name(), search.check_in(), search.check_out()));
        ThreadPatch {
            title,
            hotel_name: search.has_hotel().then(|| search.hotel_name().to_string()),
            hotel_id: evaluation.hotel_id.clone(),
            check_in: search.check_in(),
            check_out: search.check_out(),
            metadata: Some(metadata_snapshot(evaluation, self.clock.now())),
        }
    }

    /// Best-effort writes. Failures are logged and surfaced as a notice; the
    /// visible transcript is left as is.
    async fn persist(&self, user_id: &UserId, thread_id: Option<&ThreadId>, plan: PersistPlan) {
        let Some(thread_id) = thread_id else {
            return;
        };
        let mut failed = false;

        for message in plan.messages.iter().filter(|m| m.is_persistable()) {
            if let Err(err) = self.repository.save_message(user_id, thread_id, message).await {
                tracing::warn!(thread_id = %thread_id, error = %err, "Failed to save message");
                failed = true;
            }
        }
        if let Some(patch) = plan.patch {
            if let Err(err) = self.repository.update_thread(user_id, thread_id, patch).await {
                tracing::warn!(thread_id = %thread_id, error = %err, "Failed to snapshot comparison");
                failed = true;
            }
        }

        if failed {
            self.notifier.notify(Notice::PersistenceWarning);
        }
    }
}

fn new_thread_for(session: &Session, first_text: &str) -> NewThread {
    if session.search_context().has_hotel() {
        return NewThread::from_search(session.search_context());
    }
    NewThread {
        hotel_name: String::new(),
        hotel_id: None,
        check_in: None,
        check_out: None,
        title: first_text.chars().take(CHAT_TITLE_CHARS).collect(),
        metadata: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::agent::{AgentCall, MockAgentService};
    use crate::adapters::notify::ChannelNotifier;
    use crate::adapters::persistence::{InMemoryThreadStore, StoreOperation};
    use crate::adapters::storage::InMemoryProfileStore;
    use crate::application::RepositoryTtls;
    use crate::domain::conversation::{MessageKind, MessageRole};
    use crate::domain::session::SessionPhase;
    use crate::ports::{AgentEnvelope, FixedClock};
    use std::time::Duration;

    struct Harness {
        agent: MockAgentService,
        store: InMemoryThreadStore,
        notifier: ChannelNotifier,
        orchestrator: SessionOrchestrator,
    }

    fn harness(agent: MockAgentService, mode: Mode) -> Harness {
        let store = InMemoryThreadStore::new();
        let notifier = ChannelNotifier::new();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2030, 4, 1).unwrap()));
        let repository = Arc::new(ThreadRepository::new(
            Arc::new(store.clone()),
            Arc::new(notifier.clone()),
            clock.clone(),
            RepositoryTtls::default(),
        ));
        let profile = Arc::new(InMemoryProfileStore::with_user(UserId::new("u-1").unwrap()));
        let orchestrator = SessionOrchestrator::new(
            Arc::new(agent.clone()),
            repository,
            profile.clone(),
            profile,
            clock,
            Arc::new(notifier.clone()),
            OrchestratorSettings {
                default_mode: mode,
                ..OrchestratorSettings::default()
            },
        );
        Harness {
            agent,
            store,
            notifier,
            orchestrator,
        }
    }

    const EVALUATION: &str = r#"{"hotel_name":"Aman Tokyo","hotel_id":"aman-tyo",
        "checkin_date":"2030-04-02","checkout_date":"2030-04-05",
        "best_choice":{"platform":"Direct","total_price":2400,"reason":"Lowest total"},
        "table_rows":[{"platform":"Direct","price":2400},{"platform":"OTA","price":2550}],
        "deep_analysis":"Direct includes breakfast."}"#;

    #[tokio::test(start_paused = true)]
    async fn reset_during_thread_creation_removes_the_new_thread() {
        let h = harness(MockAgentService::new(), Mode::Chat);
        h.store
            .delay_on(StoreOperation::CreateThread, Duration::from_secs(1))
            .await;

        let (outcome, ()) = tokio::join!(h.orchestrator.submit("hello"), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            h.orchestrator.new_chat();
        });

        assert_eq!(outcome.unwrap(), SubmitOutcome::Discarded);
        assert_eq!(h.store.thread_count().await, 0);
        assert_eq!(h.agent.call_count(), 0);
        assert!(h.orchestrator.list_threads().await.unwrap().is_empty());
        assert!(h.orchestrator.snapshot().thread_id().is_none());
    }

    #[tokio::test]
    async fn blank_utterance_is_rejected_without_side_effects() {
        let h = harness(MockAgentService::new(), Mode::Expert);
        let err = h.orchestrator.submit("  ").await.unwrap_err();
        assert!(matches!(err, ConversationError::Validation(_)));
        assert!(h.orchestrator.snapshot().messages().is_empty());
        assert_eq!(h.agent.call_count(), 0);
    }

    #[tokio::test]
    async fn evaluation_appends_comparison_and_analysis() {
        let agent = MockAgentService::new().with_envelope(AgentEnvelope::evaluation(EVALUATION));
        let h = harness(agent, Mode::Expert);

        let outcome = h.orchestrator.submit("Aman Tokyo").await.unwrap();

        let messages = outcome.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, MessageKind::Comparison);
        assert!(messages[1].content.contains("Direct includes breakfast."));

        let session = h.orchestrator.snapshot();
        assert_eq!(session.phase(), SessionPhase::Evaluated);
        assert_eq!(session.hotel_id(), Some("aman-tyo"));
        assert!(!h.orchestrator.is_loading());

        let thread_id = session.thread_id().unwrap().clone();
        // user message, comparison, deep analysis
        assert_eq!(h.store.message_count(&thread_id).await, 3);
    }

    #[tokio::test]
    async fn follow_up_carries_comparison_context() {
        let agent = MockAgentService::new()
            .with_envelope(AgentEnvelope::evaluation(EVALUATION))
            .with_envelope(AgentEnvelope::text("Yes, there is a gym."));
        let h = harness(agent, Mode::Expert);

        h.orchestrator.submit("Aman Tokyo").await.unwrap();
        h.orchestrator.submit("does it have a gym?").await.unwrap();

        match h.agent.last_call() {
            Some(AgentCall::Message(request)) => {
                assert_eq!(request.message_text, "does it have a gym?");
                assert!(request.force_dispatch);
                let context = request.comparison_context.expect("context attached");
                assert_eq!(context.hotel_name, "Aman Tokyo");
            }
            other => panic!("expected message call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn agent_failure_becomes_one_assistant_message() {
        let agent = MockAgentService::new().with_error(AgentError::Timeout { timeout_secs: 300 });
        let h = harness(agent, Mode::Chat);

        let outcome = h.orchestrator.submit("hello").await.unwrap();

        assert_eq!(outcome.messages().len(), 1);
        assert_eq!(
            outcome.messages()[0].content,
            Locale::En.failure(ErrorCode::Timeout)
        );
        assert!(!h.orchestrator.is_loading());
    }

    #[tokio::test]
    async fn failed_message_save_warns_but_keeps_transcript() {
        let agent = MockAgentService::new().with_envelope(AgentEnvelope::text("hi there"));
        let h = harness(agent, Mode::Chat);
        h.store.fail_on(StoreOperation::AddMessage).await;

        h.orchestrator.submit("hello").await.unwrap();

        let roles: Vec<MessageRole> = h
            .orchestrator
            .snapshot()
            .messages()
            .iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
        assert!(h.notifier.drain().contains(&Notice::PersistenceWarning));
    }

    #[tokio::test]
    async fn mode_cannot_change_after_first_dispatch() {
        let h = harness(MockAgentService::new(), Mode::Chat);
        h.orchestrator.set_mode(Mode::Expert).unwrap();
        h.orchestrator.set_mode(Mode::Chat).unwrap();
        h.orchestrator.submit("hello").await.unwrap();

        assert!(h.orchestrator.set_mode(Mode::Expert).is_err());
        h.orchestrator.new_chat();
        assert!(h.orchestrator.set_mode(Mode::Expert).is_ok());
    }

    #[tokio::test]
    async fn booking_strategy_needs_evaluation() {
        let agent = MockAgentService::new()
            .with_envelope(AgentEnvelope::evaluation(EVALUATION))
            .with_strategy(crate::ports::BookingStrategyReply {
                kind: "text".into(),
                reply: "Book direct on a Tuesday.".into(),
            });
        let h = harness(agent, Mode::Expert);

        assert!(matches!(
            h.orchestrator.request_booking_strategy().await,
            Err(ConversationError::Validation(_))
        ));

        h.orchestrator.submit("Aman Tokyo").await.unwrap();
        let outcome = h.orchestrator.request_booking_strategy().await.unwrap();
        assert_eq!(outcome.messages()[0].content, "Book direct on a Tuesday.");
        match h.agent.last_call() {
            Some(AgentCall::BookingStrategy(query)) => assert_eq!(query.hotel_id, "aman-tyo"),
            other => panic!("expected booking strategy call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn open_thread_restores_evaluated_session() {
        let agent = MockAgentService::new().with_envelope(AgentEnvelope::evaluation(EVALUATION));
        let h = harness(agent, Mode::Expert);
        h.orchestrator.submit("Aman Tokyo").await.unwrap();
        let thread_id = h.orchestrator.snapshot().thread_id().unwrap().clone();

        h.orchestrator.new_chat();
        assert!(h.orchestrator.snapshot().messages().is_empty());

        h.orchestrator.open_thread(&thread_id).await.unwrap();
        let session = h.orchestrator.snapshot();
        assert_eq!(session.phase(), SessionPhase::Evaluated);
        assert!(session.search_context().is_confirmed());
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[1].kind, MessageKind::Comparison);
        assert_eq!(session.hotel_id(), Some("aman-tyo"));
    }

    #[tokio::test]
    async fn deleting_active_thread_resets_session() {
        let h = harness(MockAgentService::new(), Mode::Chat);
        h.orchestrator.submit("hello").await.unwrap();
        let thread_id = h.orchestrator.snapshot().thread_id().unwrap().clone();

        h.orchestrator.delete_thread(&thread_id).await.unwrap();
        assert!(h.orchestrator.snapshot().thread_id().is_none());
        assert!(h.orchestrator.list_threads().await.unwrap().is_empty());
    }
}
