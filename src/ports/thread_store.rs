//! Thread Store Port - Interface for the thread persistence service.
//!
//! Every operation acts on behalf of one authenticated user. Implementations
//! must enforce:
//!
//! - `Unauthorized` when no user is authenticated
//! - `NotFound` when the thread does not exist
//! - `Forbidden` when the thread belongs to another user
//!
//! Deleting a thread deletes its messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::conversation::{Message, MessageRole, NewThread, Thread, ThreadPatch};
use crate::domain::foundation::{ErrorCode, MessageId, ThreadId, Timestamp, UserId};

/// Port for thread and message persistence.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    async fn create_thread(&self, user_id: &UserId, thread: NewThread) -> Result<Thread, StoreError>;

    /// Threads owned by the user, most recently updated first.
    async fn list_threads(&self, user_id: &UserId) -> Result<Vec<Thread>, StoreError>;

    async fn get_thread(&self, user_id: &UserId, thread_id: &ThreadId) -> Result<Thread, StoreError>;

    /// Merges `patch.metadata` into the stored metadata and bumps `updated_at`.
    async fn update_thread(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
        patch: ThreadPatch,
    ) -> Result<Thread, StoreError>;

    async fn delete_thread(&self, user_id: &UserId, thread_id: &ThreadId) -> Result<(), StoreError>;

    /// Messages of a thread in timestamp order.
    async fn list_messages(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    /// Appends a message and bumps the thread's `updated_at`.
    async fn add_message(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
        message: NewMessage,
    ) -> Result<StoredMessage, StoreError>;
}

/// Body of `POST /threads/:id/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
}

/// A message as the persistence service returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub thread_id: ThreadId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: Timestamp,
}

impl StoredMessage {
    pub fn into_message(self) -> Message {
        Message::from_stored(
            MessageId::from_server(self.id),
            self.role,
            self.content,
            self.created_at,
        )
    }
}

/// Errors from the persistence service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not authenticated")]
    Unauthorized,

    #[error("thread {0} belongs to another user")]
    Forbidden(ThreadId),

    #[error("thread {0} not found")]
    NotFound(ThreadId),

    #[error("network error: {0}")]
    Network(String),

    #[error("persistence service error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::Unauthorized => ErrorCode::Unauthorized,
            StoreError::Forbidden(_) => ErrorCode::Forbidden,
            StoreError::NotFound(_) => ErrorCode::ThreadNotFound,
            StoreError::Network(_) => ErrorCode::NetworkError,
            StoreError::Server { .. } | StoreError::Decode(_) => ErrorCode::StorageError,
        }
    }
}
