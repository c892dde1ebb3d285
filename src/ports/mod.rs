//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Service Ports
//!
//! - `AgentService` - The external pricing agent (message, compare, booking strategy)
//! - `ThreadStore` - Thread and message persistence with per-user ownership
//!
//! ## Local Ports
//!
//! - `IdentityProvider` / `HistoryStore` - Anonymous user id and recent searches
//! - `UserNotifier` - Advisory notices (retrying, delete failed, not saved)
//! - `Clock` - Current time and local date

mod agent_service;
mod clock;
mod identity;
mod notifier;
mod thread_store;

pub use agent_service::{
    AgentEnvelope, AgentError, AgentMessageRequest, AgentService, BookingStrategyReply,
    CompareRequest,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use identity::{push_history, HistoryStore, IdentityProvider, ProfileStoreError, HISTORY_LIMIT};
pub use notifier::{Notice, UserNotifier};
pub use thread_store::{NewMessage, StoreError, StoredMessage, ThreadStore};
