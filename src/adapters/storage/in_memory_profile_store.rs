//! In-Memory Profile Store Adapter
//!
//! Holds the user id and search history for the life of the process.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::UserId;
use crate::ports::{push_history, HistoryStore, IdentityProvider, ProfileStoreError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    user_id: Arc<RwLock<Option<UserId>>>,
    history: Arc<RwLock<Vec<String>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already knows its user.
    pub fn with_user(user_id: UserId) -> Self {
        Self {
            user_id: Arc::new(RwLock::new(Some(user_id))),
            history: Arc::default(),
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryProfileStore {
    async fn user_id(&self) -> Result<UserId, ProfileStoreError> {
        let mut slot = self.user_id.write().await;
        Ok(slot.get_or_insert_with(UserId::anonymous).clone())
    }

    async fn set_user_id(&self, user_id: UserId) -> Result<(), ProfileStoreError> {
        *self.user_id.write().await = Some(user_id);
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for InMemoryProfileStore {
    async fn recent_searches(&self) -> Result<Vec<String>, ProfileStoreError> {
        Ok(self.history.read().await.clone())
    }

    async fn record_search(&self, hotel_name: &str) -> Result<(), ProfileStoreError> {
        push_history(&mut *self.history.write().await, hotel_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anonymous_id_is_stable() {
        let store = InMemoryProfileStore::new();
        let first = store.user_id().await.unwrap();
        assert_eq!(store.user_id().await.unwrap(), first);
    }

    #[tokio::test]
    async fn history_is_most_recent_first() {
        let store = InMemoryProfileStore::with_user(UserId::new("u").unwrap());
        store.record_search("A").await.unwrap();
        store.record_search("B").await.unwrap();
        assert_eq!(store.recent_searches().await.unwrap(), vec!["B", "A"]);
    }
}
