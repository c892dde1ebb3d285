//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machines)
//! - `search` - Search context and the stay date selector
//! - `comparison` - Agent replies, evaluations and comparison context
//! - `conversation` - Threads, messages and localized copy
//! - `session` - Session lifecycle and intent routing

pub mod comparison;
pub mod conversation;
pub mod foundation;
pub mod search;
pub mod session;
