//! Intent routing - decides whether an utterance is a structured price
//! comparison or a free-form message.
//!
//! The heuristics are evaluated in a fixed order:
//!
//! 1. chat mode always sends a message
//! 2. questions and general queries send a message, even in expert mode
//! 3. an unconfirmed context takes the utterance as the hotel name
//! 4. with a confirmed context, follow-ups send a message and anything else
//!    becomes a new hotel name

use std::collections::HashSet;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::session::{Mode, Session};
use crate::domain::foundation::ValidationError;
use crate::domain::search::{SearchContext, DEFAULT_NIGHTS};

/// Utterances with a facility word count as questions when at most this long.
const SHORT_UTTERANCE_CHARS: usize = 30;

/// Follow-up threshold once the context is confirmed.
const FOLLOW_UP_MAX_CHARS: usize = 50;

static QUESTION_STARTERS_EN: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "what", "how", "why", "when", "where", "which", "who", "can", "could", "is", "are",
        "does", "do", "did", "will", "would", "should", "tell", "explain", "any", "please",
    ]
    .into_iter()
    .collect()
});

static INTERROGATIVES_EN: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "what", "how", "why", "when", "where", "which", "who", "can", "could", "is", "are",
        "does", "do", "will", "would", "should",
    ]
    .into_iter()
    .collect()
});

static FACILITY_WORDS_EN: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "gym", "pool", "breakfast", "spa", "parking", "wifi", "shuttle", "restaurant", "bar",
        "lounge", "fitness", "sauna", "pet", "pets", "checkout", "checkin", "airport",
    ]
    .into_iter()
    .collect()
});

static HOTEL_REFERENCES_EN: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["hotel", "it", "its", "they", "there", "this", "room", "rooms"]
        .into_iter()
        .collect()
});

const QUESTION_STARTERS_ZH: &[&str] = &["请问", "为什么", "怎么", "如何", "什么", "哪", "能不能", "可不可以", "有没有", "是否"];
const QUESTION_MARKERS_ZH: &[&str] = &["吗", "呢", "什么", "怎么", "如何", "为什么", "哪里", "哪个", "是否", "有没有", "能否"];
const FACILITY_WORDS_ZH: &[&str] = &["健身房", "泳池", "游泳池", "早餐", "停车", "无线网", "接送", "餐厅", "酒吧", "行政酒廊"];
const HOTEL_REFERENCES_ZH: &[&str] = &["酒店", "这家", "该酒店", "房间"];
const INTERROGATIVES_ZH: &[&str] = &["什么", "如何", "为什么", "哪里", "可以", "是否", "有没有"];

/// Where a dispatch goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchTarget {
    Message,
    Compare,
    BookingStrategy,
}

/// Structured comparison payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareParams {
    pub destination: String,
    pub hotel_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub room_count: u32,
    pub room_type: Option<String>,
    pub adults: u32,
    pub children: u32,
    pub additional_notes: String,
}

impl CompareParams {
    /// Builds the payload from a confirmed context.
    pub fn from_search(search: &SearchContext) -> Result<Self, ValidationError> {
        if !search.has_hotel() {
            return Err(ValidationError::empty_field("hotel_name"));
        }
        let (Some(check_in), Some(check_out)) = (search.check_in(), search.check_out()) else {
            return Err(ValidationError::empty_field("check_in"));
        };

        Ok(Self {
            destination: destination_of(search.hotel_name()),
            hotel_name: search.hotel_name().to_string(),
            check_in,
            check_out,
            room_count: search.rooms(),
            room_type: search.room_type().map(str::to_string),
            adults: search.adults(),
            children: search.children(),
            additional_notes: search.preferences().to_string(),
        })
    }
}

/// Cheapest-booking strategy lookup for an evaluated hotel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStrategyQuery {
    pub hotel_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

/// Routing outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Message { text: String },
    Compare(CompareParams),
    BookingStrategy(BookingStrategyQuery),
}

impl Dispatch {
    pub fn target(&self) -> DispatchTarget {
        match self {
            Dispatch::Message { .. } => DispatchTarget::Message,
            Dispatch::Compare(_) => DispatchTarget::Compare,
            Dispatch::BookingStrategy(_) => DispatchTarget::BookingStrategy,
        }
    }
}

/// Routes utterances for a session.
#[derive(Debug, Clone)]
pub struct IntentRouter {
    default_nights: u32,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new(DEFAULT_NIGHTS)
    }
}

impl IntentRouter {
    pub fn new(default_nights: u32) -> Self {
        Self {
            default_nights: default_nights.max(1),
        }
    }

    /// Routes one utterance, locking the session mode.
    pub fn route(
        &self,
        utterance: &str,
        session: &mut Session,
        today: NaiveDate,
    ) -> Result<Dispatch, ValidationError> {
        let text = utterance.trim();
        if text.is_empty() {
            return Err(ValidationError::empty_field("utterance"));
        }
        session.lock_mode();

        if session.mode() == Mode::Chat || is_question_or_general_query(text) {
            return Ok(message(text));
        }

        if !session.search_context().is_confirmed() {
            session.set_hotel_name(text, today, self.default_nights)?;
            session.confirm_context(today, self.default_nights)?;
            return Ok(Dispatch::Compare(CompareParams::from_search(
                session.search_context(),
            )?));
        }

        if is_follow_up(text) {
            return Ok(message(text));
        }

        session.set_hotel_name(text, today, self.default_nights)?;
        Ok(Dispatch::Compare(CompareParams::from_search(
            session.search_context(),
        )?))
    }

    /// Booking-strategy dispatch for an evaluated hotel.
    pub fn booking_strategy(&self, session: &Session) -> Result<Dispatch, ValidationError> {
        let hotel_id = session
            .hotel_id()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ValidationError::empty_field("hotel_id"))?;
        let search = session.search_context();
        let (Some(check_in), Some(check_out)) = (search.check_in(), search.check_out()) else {
            return Err(ValidationError::empty_field("check_in"));
        };
        Ok(Dispatch::BookingStrategy(BookingStrategyQuery {
            hotel_id: hotel_id.to_string(),
            check_in,
            check_out,
        }))
    }
}

fn message(text: &str) -> Dispatch {
    Dispatch::Message {
        text: text.to_string(),
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn has_question_mark(text: &str) -> bool {
    text.contains('?') || text.contains('？')
}

/// True for questions and general queries that should reach the chat agent
/// even in expert mode.
pub fn is_question_or_general_query(text: &str) -> bool {
    if has_question_mark(text) {
        return true;
    }

    let words = words(text);
    if words
        .first()
        .is_some_and(|w| QUESTION_STARTERS_EN.contains(w.as_str()))
    {
        return true;
    }
    if QUESTION_STARTERS_ZH.iter().any(|s| text.starts_with(s))
        || QUESTION_MARKERS_ZH.iter().any(|m| text.contains(m))
    {
        return true;
    }

    let mentions_facility = words.iter().any(|w| FACILITY_WORDS_EN.contains(w.as_str()))
        || FACILITY_WORDS_ZH.iter().any(|f| text.contains(f));
    let is_short = text.chars().count() <= SHORT_UTTERANCE_CHARS;
    let references_hotel = words.iter().any(|w| HOTEL_REFERENCES_EN.contains(w.as_str()))
        || HOTEL_REFERENCES_ZH.iter().any(|r| text.contains(r));

    mentions_facility && (is_short || references_hotel)
}

/// True when, with a confirmed context, the utterance continues the current
/// conversation rather than naming a new hotel.
pub fn is_follow_up(text: &str) -> bool {
    has_question_mark(text)
        || text.chars().count() < FOLLOW_UP_MAX_CHARS
        || words(text)
            .first()
            .is_some_and(|w| INTERROGATIVES_EN.contains(w.as_str()))
        || INTERROGATIVES_ZH.iter().any(|s| text.contains(s))
}

/// Destination sent with a comparison: the part after the last comma of the
/// hotel name ("The Ritz-Carlton, New York" -> "New York"), else the name.
pub fn destination_of(hotel_name: &str) -> String {
    hotel_name
        .rsplit_once(',')
        .map(|(_, tail)| tail.trim())
        .filter(|tail| !tail.is_empty())
        .unwrap_or_else(|| hotel_name.trim())
        .to_string()
}
