//! Application layer - session orchestration over the ports.
//!
//! The [`SessionOrchestrator`] owns one conversation session and coordinates
//! the agent, the thread repository and the local profile. The
//! [`ThreadRepository`] adds read-through caching and optimistic deletes on
//! top of the [`ThreadStore`](crate::ports::ThreadStore) port.

mod cache;
mod error;
mod orchestrator;
mod thread_repository;

pub use cache::ReadThroughCache;
pub use error::ConversationError;
pub use orchestrator::{OrchestratorSettings, SessionOrchestrator, SubmitOutcome};
pub use thread_repository::{RepositoryTtls, ThreadRepository};
