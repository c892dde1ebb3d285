//! Identity and history ports.
//!
//! The anonymous user id and the recent-search history live in local storage.
//! Core logic reads and writes them only through these ports.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::UserId;

/// Most recent distinct hotel names kept in history.
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileStoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to serialize profile: {0}")]
    Serialization(String),

    #[error("Failed to deserialize profile: {0}")]
    Deserialization(String),
}

/// Provides the current user's identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the stored user id, generating and storing an anonymous one on
    /// first use.
    async fn user_id(&self) -> Result<UserId, ProfileStoreError>;

    async fn set_user_id(&self, user_id: UserId) -> Result<(), ProfileStoreError>;
}

/// Recent hotel searches.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Most recent first.
    async fn recent_searches(&self) -> Result<Vec<String>, ProfileStoreError>;

    /// Moves the hotel to the front, dropping duplicates and trimming to
    /// [`HISTORY_LIMIT`].
    async fn record_search(&self, hotel_name: &str) -> Result<(), ProfileStoreError>;
}

/// Applies one search to a history list.
pub fn push_history(history: &mut Vec<String>, hotel_name: &str) {
    let hotel_name = hotel_name.trim();
    if hotel_name.is_empty() {
        return;
    }
    history.retain(|h| !h.eq_ignore_ascii_case(hotel_name));
    history.insert(0, hotel_name.to_string());
    history.truncate(HISTORY_LIMIT);
}
