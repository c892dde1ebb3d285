//! The hotel search a session is comparing prices for.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::DateRange;
use crate::domain::foundation::ValidationError;

/// Default stay length when the user never picked dates.
pub const DEFAULT_NIGHTS: u32 = 3;

/// Search parameters for one hotel.
///
/// # Invariants
///
/// - `rooms >= 1`, `adults >= 1`
/// - when confirmed, both dates are set and `check_out > check_in`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchContext {
    hotel_name: String,
    dates: DateRange,
    rooms: u32,
    adults: u32,
    children: u32,
    room_type: String,
    preferences: String,
    is_confirmed: bool,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self {
            hotel_name: String::new(),
            dates: DateRange::empty(),
            rooms: 1,
            adults: 2,
            children: 0,
            room_type: String::new(),
            preferences: String::new(),
            is_confirmed: false,
        }
    }
}

impl SearchContext {
    /// Draft context for a hotel, with dates defaulted to tomorrow and
    /// tomorrow + `nights`.
    pub fn for_hotel(hotel_name: impl Into<String>, today: NaiveDate, nights: u32) -> Self {
        let mut ctx = Self {
            hotel_name: hotel_name.into(),
            ..Self::default()
        };
        ctx.fill_default_dates(today, nights);
        ctx
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn hotel_name(&self) -> &str {
        &self.hotel_name
    }

    pub fn dates(&self) -> DateRange {
        self.dates
    }

    pub fn check_in(&self) -> Option<NaiveDate> {
        self.dates.check_in
    }

    pub fn check_out(&self) -> Option<NaiveDate> {
        self.dates.check_out
    }

    pub fn rooms(&self) -> u32 {
        self.rooms
    }

    pub fn adults(&self) -> u32 {
        self.adults
    }

    pub fn children(&self) -> u32 {
        self.children
    }

    /// Room type, `None` when the user expressed no preference.
    pub fn room_type(&self) -> Option<&str> {
        let trimmed = self.room_type.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn preferences(&self) -> &str {
        &self.preferences
    }

    pub fn is_confirmed(&self) -> bool {
        self.is_confirmed
    }

    pub fn has_hotel(&self) -> bool {
        !self.hotel_name.trim().is_empty()
    }

    pub fn nights(&self) -> Option<u32> {
        self.dates.nights()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_hotel_name(&mut self, hotel_name: impl Into<String>) {
        self.hotel_name = hotel_name.into().trim().to_string();
    }

    /// Applies a date selection.
    ///
    /// Once confirmed only a complete range is accepted, so the confirmed
    /// invariant keeps holding; partial selections are ignored.
    pub fn apply_dates(&mut self, range: DateRange) -> bool {
        if self.is_confirmed && !range.is_complete() {
            return false;
        }
        self.dates = range;
        true
    }

    /// Overwrites dates with values the agent reported for an evaluation.
    pub fn apply_authoritative_dates(&mut self, check_in: NaiveDate, check_out: NaiveDate) {
        if let Some(range) = DateRange::complete(check_in, check_out) {
            self.dates = range;
        }
    }

    pub fn set_guests(&mut self, rooms: u32, adults: u32, children: u32) -> Result<(), ValidationError> {
        if rooms < 1 {
            return Err(ValidationError::below_minimum("rooms", 1, rooms));
        }
        if adults < 1 {
            return Err(ValidationError::below_minimum("adults", 1, adults));
        }
        self.rooms = rooms;
        self.adults = adults;
        self.children = children;
        Ok(())
    }

    pub fn set_room_type(&mut self, room_type: impl Into<String>) {
        self.room_type = room_type.into();
    }

    pub fn set_preferences(&mut self, preferences: impl Into<String>) {
        self.preferences = preferences.into();
    }

    /// Fills whatever dates are missing: check-in defaults to tomorrow,
    /// check-out to check-in + `nights`. A check-in already in the past is
    /// treated as missing.
    pub fn fill_default_dates(&mut self, today: NaiveDate, nights: u32) {
        let nights = i64::from(nights.max(1));
        let check_in = self
            .dates
            .check_in
            .filter(|check_in| *check_in >= today)
            .unwrap_or_else(|| today + Duration::days(1));
        let check_out = match self.dates.check_out {
            Some(out) if out > check_in => out,
            _ => check_in + Duration::days(nights),
        };
        self.dates = DateRange {
            check_in: Some(check_in),
            check_out: Some(check_out),
        };
    }

    /// Marks the context confirmed, filling default dates first.
    pub fn confirm(&mut self, today: NaiveDate, nights: u32) -> Result<(), ValidationError> {
        if !self.has_hotel() {
            return Err(ValidationError::empty_field("hotel_name"));
        }
        self.fill_default_dates(today, nights);
        self.is_confirmed = true;
        Ok(())
    }
}
