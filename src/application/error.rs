//! Errors returned by the session orchestrator.
//!
//! Agent failures never surface here; they become an assistant message in
//! the transcript. What remains are input problems and direct persistence
//! operations the caller asked for.

use thiserror::Error;

use crate::domain::foundation::{ErrorCode, ValidationError};
use crate::ports::{ProfileStoreError, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// An agent call for this session is still pending.
    #[error("another request is still in progress")]
    Busy,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("profile error: {0}")]
    Profile(#[from] ProfileStoreError),
}

impl ConversationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConversationError::Validation(_) => ErrorCode::ValidationFailed,
            ConversationError::Busy => ErrorCode::ServiceBusy,
            ConversationError::Store(err) => err.code(),
            ConversationError::Profile(_) => ErrorCode::StorageError,
        }
    }
}
