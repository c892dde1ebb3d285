//! Session aggregate - one user's live conversation with the assistant.
//!
//! # Invariants
//!
//! - once the first utterance is dispatched the mode is locked until reset
//! - `has_received_evaluation` flips to true only when a comparison with at
//!   least one rate is shown, and stays true until reset
//! - `messages` is append-only between resets

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::conversation::Message;
use crate::domain::foundation::{StateMachine, ThreadId, ValidationError};
use crate::domain::search::{DateRange, SearchContext};

/// How utterances are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Prefer structured price comparisons.
    #[default]
    Expert,
    /// Always free-form chat.
    Chat,
}

/// Session lifecycle.
///
/// ```text
/// Idle --hotel named--> DraftContext --context confirmed--> Confirmed
/// Confirmed --evaluation with rates--> Evaluated
/// any --new chat--> Idle
/// any --follow-up--> itself
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    DraftContext,
    Confirmed,
    Evaluated,
}

impl StateMachine for SessionPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        self == target || self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionPhase::*;
        match self {
            Idle => vec![DraftContext],
            DraftContext => vec![Confirmed, Idle],
            Confirmed => vec![Evaluated, Idle],
            Evaluated => vec![Idle],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    mode: Mode,
    is_mode_locked: bool,
    phase: SessionPhase,
    search_context: SearchContext,
    date_selection: DateRange,
    thread_id: Option<ThreadId>,
    hotel_id: Option<String>,
    has_received_evaluation: bool,
    messages: Vec<Message>,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            is_mode_locked: false,
            phase: SessionPhase::Idle,
            search_context: SearchContext::default(),
            date_selection: DateRange::empty(),
            thread_id: None,
            hotel_id: None,
            has_received_evaluation: false,
            messages: Vec::new(),
        }
    }

    /// Rebuilds a session from a persisted thread.
    pub fn resume(
        mode: Mode,
        thread_id: ThreadId,
        search_context: SearchContext,
        hotel_id: Option<String>,
        messages: Vec<Message>,
        evaluated: bool,
    ) -> Self {
        let evaluated = evaluated && search_context.is_confirmed();
        let phase = match (evaluated, search_context.is_confirmed()) {
            (true, _) => SessionPhase::Evaluated,
            (false, true) => SessionPhase::Confirmed,
            (false, false) if search_context.has_hotel() => SessionPhase::DraftContext,
            _ => SessionPhase::Idle,
        };
        Self {
            mode,
            is_mode_locked: !messages.is_empty(),
            phase,
            date_selection: search_context.dates(),
            search_context,
            thread_id: Some(thread_id),
            hotel_id,
            has_received_evaluation: evaluated,
            messages,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_mode_locked(&self) -> bool {
        self.is_mode_locked
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn search_context(&self) -> &SearchContext {
        &self.search_context
    }

    pub fn date_selection(&self) -> DateRange {
        self.date_selection
    }

    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.thread_id.as_ref()
    }

    pub fn hotel_id(&self) -> Option<&str> {
        self.hotel_id.as_deref()
    }

    pub fn has_received_evaluation(&self) -> bool {
        self.has_received_evaluation
    }

    /// After the first comparison, new input is framed as a follow-up.
    pub fn expects_follow_up(&self) -> bool {
        self.has_received_evaluation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mode
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), ValidationError> {
        if self.is_mode_locked && mode != self.mode {
            return Err(ValidationError::invalid_state(
                "mode cannot change after the conversation has started",
            ));
        }
        self.mode = mode;
        Ok(())
    }

    pub fn lock_mode(&mut self) {
        self.is_mode_locked = true;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Search context
    // ─────────────────────────────────────────────────────────────────────────

    /// Names the hotel. The first time, dates default to tomorrow and
    /// tomorrow + `nights`.
    pub fn set_hotel_name(&mut self, hotel_name: &str, today: NaiveDate, nights: u32) -> Result<(), ValidationError> {
        let hotel_name = hotel_name.trim();
        if hotel_name.is_empty() {
            return Err(ValidationError::empty_field("hotel_name"));
        }
        if !self.search_context.has_hotel() && !self.search_context.is_confirmed() {
            let mut fresh = SearchContext::for_hotel(hotel_name, today, nights);
            if self.date_selection.check_in.is_some() {
                fresh.apply_dates(self.date_selection);
            }
            self.date_selection = fresh.dates();
            self.search_context = fresh;
        } else {
            self.search_context.set_hotel_name(hotel_name);
        }
        if self.phase == SessionPhase::Idle {
            self.phase = self.phase.transition_to(SessionPhase::DraftContext)?;
        }
        Ok(())
    }

    /// Feeds one calendar click into the date selector and copies the result
    /// into the search context where allowed.
    pub fn select_date(&mut self, click: NaiveDate, today: NaiveDate) -> DateRange {
        self.date_selection = self.date_selection.select(click, today);
        self.search_context.apply_dates(self.date_selection);
        self.date_selection
    }

    pub fn search_context_mut(&mut self) -> &mut SearchContext {
        &mut self.search_context
    }

    /// Confirms the context, filling default dates, and enters `Confirmed`.
    pub fn confirm_context(&mut self, today: NaiveDate, nights: u32) -> Result<(), ValidationError> {
        self.search_context.confirm(today, nights)?;
        self.date_selection = self.search_context.dates();
        if self.phase == SessionPhase::Idle {
            self.phase = self.phase.transition_to(SessionPhase::DraftContext)?;
        }
        if self.phase == SessionPhase::DraftContext {
            self.phase = self.phase.transition_to(SessionPhase::Confirmed)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conversation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn attach_thread(&mut self, thread_id: ThreadId) {
        self.thread_id = Some(thread_id);
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Records a comparison with rates. The phase only advances from
    /// `Confirmed`; a comparison reached through chat still sets the flag.
    pub fn mark_evaluated(&mut self, hotel_id: Option<String>) {
        if self.phase.can_transition_to(&SessionPhase::Evaluated) {
            self.phase = SessionPhase::Evaluated;
        }
        self.has_received_evaluation = true;
        if hotel_id.is_some() {
            self.hotel_id = hotel_id;
        }
    }

    /// "New chat": back to `Idle` with an empty transcript, default context,
    /// no thread and an unlocked mode.
    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 8, 1).unwrap()
    }

    #[test]
    fn phase_transitions_follow_lifecycle() {
        use SessionPhase::*;
        assert!(Idle.can_transition_to(&DraftContext));
        assert!(!Idle.can_transition_to(&Evaluated));
        assert!(Confirmed.can_transition_to(&Evaluated));
        assert!(Evaluated.can_transition_to(&Idle));
        assert!(Evaluated.can_transition_to(&Evaluated));
        assert!(!Evaluated.is_terminal());
    }

    #[test]
    fn mode_locked_after_lock() {
        let mut session = Session::new(Mode::Expert);
        session.set_mode(Mode::Chat).unwrap();
        session.lock_mode();
        assert!(session.set_mode(Mode::Expert).is_err());
        assert!(session.set_mode(Mode::Chat).is_ok());
    }

    #[test]
    fn set_hotel_name_enters_draft_with_default_dates() {
        let mut session = Session::new(Mode::Expert);
        session.set_hotel_name("Four Seasons", today(), 3).unwrap();
        assert_eq!(session.phase(), SessionPhase::DraftContext);
        assert_eq!(session.search_context().nights(), Some(3));
        assert!(!session.search_context().is_confirmed());
    }

    #[test]
    fn dates_picked_before_hotel_are_kept() {
        let mut session = Session::new(Mode::Expert);
        let d1 = NaiveDate::from_ymd_opt(2030, 8, 10).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2030, 8, 12).unwrap();
        session.select_date(d1, today());
        session.select_date(d2, today());
        session.set_hotel_name("Four Seasons", today(), 3).unwrap();
        assert_eq!(session.search_context().check_in(), Some(d1));
        assert_eq!(session.search_context().check_out(), Some(d2));
    }

    #[test]
    fn confirm_moves_to_confirmed() {
        let mut session = Session::new(Mode::Expert);
        session.set_hotel_name("Four Seasons", today(), 3).unwrap();
        session.confirm_context(today(), 3).unwrap();
        assert_eq!(session.phase(), SessionPhase::Confirmed);
        session.mark_evaluated(Some("fs-1".into()));
        assert_eq!(session.phase(), SessionPhase::Evaluated);
        assert_eq!(session.hotel_id(), Some("fs-1"));
        assert!(session.expects_follow_up());
    }

    #[test]
    fn mark_evaluated_in_chat_keeps_phase() {
        let mut session = Session::new(Mode::Chat);
        session.mark_evaluated(None);
        assert!(session.has_received_evaluation());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn reset_clears_everything_but_mode() {
        let mut session = Session::new(Mode::Chat);
        session.lock_mode();
        session.push_message(Message::user("hi"));
        session.attach_thread(ThreadId::new("t").unwrap());
        session.reset();
        assert_eq!(session.mode(), Mode::Chat);
        assert!(!session.is_mode_locked());
        assert!(session.messages().is_empty());
        assert!(session.thread_id().is_none());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn resume_without_confirmed_context_is_not_evaluated() {
        let thread_id = ThreadId::new("t").unwrap();
        let resumed = Session::resume(
            Mode::Expert,
            thread_id.clone(),
            SearchContext::default(),
            None,
            vec![Message::user("hi")],
            true,
        );
        assert_eq!(resumed.phase(), SessionPhase::Idle);
        assert!(!resumed.expects_follow_up());

        let mut search = SearchContext::for_hotel("Aman Tokyo", today(), 3);
        search.confirm(today(), 3).unwrap();
        let resumed = Session::resume(Mode::Expert, thread_id, search, None, Vec::new(), true);
        assert_eq!(resumed.phase(), SessionPhase::Evaluated);
    }
}
