//! Date range selector.
//!
//! A pure state machine that turns calendar clicks into a (check-in,
//! check-out) pair. Three observable states:
//!
//! ```text
//! S1 Empty        --click-->                         S2 (check_in = click)
//! S2 CheckInOnly  --click <= check_in-->             S2 (check_in = click)
//! S2 CheckInOnly  --click >  check_in-->             S3 (check_out = click)
//! S3 Complete     --click-->                         S2 (new selection)
//! ```
//!
//! Clicks before `today` are ignored. A range with zero or negative nights is
//! never returned: it collapses back to S2.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Observable state of a [`DateRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    /// S1: nothing selected.
    Empty,
    /// S2: check-in chosen, check-out pending.
    CheckInOnly,
    /// S3: both dates chosen, check-out strictly after check-in.
    Complete,
}

/// A possibly partial stay range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
}

impl DateRange {
    /// S1.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a range, collapsing an inverted or zero-night range to S2.
    pub fn new(check_in: Option<NaiveDate>, check_out: Option<NaiveDate>) -> Self {
        Self {
            check_in,
            check_out,
        }
        .normalized()
    }

    /// Complete range; `None` unless `check_out > check_in`.
    pub fn complete(check_in: NaiveDate, check_out: NaiveDate) -> Option<Self> {
        (check_out > check_in).then_some(Self {
            check_in: Some(check_in),
            check_out: Some(check_out),
        })
    }

    pub fn state(&self) -> SelectionState {
        match (self.check_in, self.check_out) {
            (None, _) => SelectionState::Empty,
            (Some(_), None) => SelectionState::CheckInOnly,
            (Some(_), Some(_)) => SelectionState::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == SelectionState::Complete
    }

    /// Applies one click. `today` must already be the local calendar date.
    pub fn select(self, click: NaiveDate, today: NaiveDate) -> Self {
        if click < today {
            return self;
        }

        let next = match (self.check_in, self.check_out) {
            (None, _) => Self {
                check_in: Some(click),
                check_out: None,
            },
            (Some(check_in), None) if click > check_in => Self {
                check_in: Some(check_in),
                check_out: Some(click),
            },
            // click <= check_in in S2, or any click in S3: restart from click
            _ => Self {
                check_in: Some(click),
                check_out: None,
            },
        };

        next.normalized()
    }

    /// Number of nights for a complete range.
    pub fn nights(&self) -> Option<u32> {
        match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => {
                let days = (check_out - check_in).num_days();
                u32::try_from(days).ok().filter(|n| *n > 0)
            }
            _ => None,
        }
    }

    fn normalized(self) -> Self {
        match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) if check_out <= check_in => Self {
                check_in: Some(check_in),
                check_out: None,
            },
            (None, Some(_)) => Self::empty(),
            _ => self,
        }
    }
}

/// Free-function form of [`DateRange::select`].
pub fn select(click: NaiveDate, state: DateRange, today: NaiveDate) -> DateRange {
    state.select(click, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn today() -> NaiveDate {
        day(0)
    }

    #[test]
    fn first_click_sets_check_in() {
        let range = DateRange::empty().select(day(2), today());
        assert_eq!(range.check_in, Some(day(2)));
        assert_eq!(range.check_out, None);
        assert_eq!(range.state(), SelectionState::CheckInOnly);
    }

    #[test]
    fn later_click_completes_range() {
        let range = DateRange::empty()
            .select(day(2), today())
            .select(day(5), today());
        assert_eq!(range.state(), SelectionState::Complete);
        assert_eq!(range.nights(), Some(3));
    }

    #[test]
    fn same_day_click_resets_check_in() {
        let range = DateRange::empty()
            .select(day(4), today())
            .select(day(4), today());
        assert_eq!(range.check_in, Some(day(4)));
        assert_eq!(range.check_out, None);
    }

    #[test]
    fn earlier_click_in_s2_moves_check_in() {
        let range = DateRange::empty()
            .select(day(4), today())
            .select(day(1), today());
        assert_eq!(range.check_in, Some(day(1)));
        assert_eq!(range.check_out, None);
    }

    #[test]
    fn click_in_s3_starts_new_selection() {
        let range = DateRange::complete(day(1), day(3))
            .unwrap()
            .select(day(10), today());
        assert_eq!(range.check_in, Some(day(10)));
        assert_eq!(range.check_out, None);
    }

    #[test]
    fn click_before_today_is_ignored() {
        let start = DateRange::empty().select(day(3), today());
        let after = start.select(day(-1), today());
        assert_eq!(start, after);
    }

    #[test]
    fn today_is_selectable() {
        let range = DateRange::empty().select(today(), today());
        assert_eq!(range.check_in, Some(today()));
    }

    #[test]
    fn new_collapses_inverted_range() {
        let range = DateRange::new(Some(day(5)), Some(day(5)));
        assert_eq!(range.check_out, None);
        assert_eq!(range.nights(), None);
    }

    #[test]
    fn complete_rejects_zero_nights() {
        assert!(DateRange::complete(day(2), day(2)).is_none());
    }

    proptest! {
        #[test]
        fn check_out_never_precedes_check_in(a in 0i64..400, b in 0i64..400) {
            let range = DateRange::empty()
                .select(day(a), today())
                .select(day(b), today());
            if b <= a {
                prop_assert_eq!(range.check_out, None);
                prop_assert_eq!(range.check_in, Some(day(b)));
            } else {
                prop_assert_eq!(range.check_out, Some(day(b)));
            }
        }

        #[test]
        fn nights_positive_whenever_both_set(clicks in proptest::collection::vec(-5i64..60, 0..12)) {
            let mut range = DateRange::empty();
            for c in clicks {
                range = range.select(day(c), today());
                if let (Some(_), Some(_)) = (range.check_in, range.check_out) {
                    prop_assert!(range.nights().unwrap_or(0) > 0);
                }
            }
        }
    }
}
