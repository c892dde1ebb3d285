//! Session domain module.
//!
//! A session is one user's live conversation: its mode, search context,
//! transcript and lifecycle phase. The [`IntentRouter`] decides how each
//! utterance is dispatched.

mod intent;
mod session;

pub use intent::{
    destination_of, is_follow_up, is_question_or_general_query, BookingStrategyQuery,
    CompareParams, Dispatch, DispatchTarget, IntentRouter,
};
pub use session::{Mode, Session, SessionPhase};
