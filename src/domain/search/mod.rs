//! Search module - what the user is asking to compare.
//!
//! - `date_range` - click-driven stay date selector
//! - `search_context` - hotel, dates, guests and preferences

mod date_range;
mod search_context;

pub use date_range::{select, DateRange, SelectionState};
pub use search_context::{SearchContext, DEFAULT_NIGHTS};
