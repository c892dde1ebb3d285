//! File-based Profile Store Adapter
//!
//! Keeps the anonymous user id and recent searches in one YAML file,
//! `profile.yaml`, under the configured state directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::foundation::UserId;
use crate::ports::{push_history, HistoryStore, IdentityProvider, ProfileStoreError};

/// On-disk profile document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalProfile {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub recent_searches: Vec<String>,
}

/// File-based storage for the local profile
#[derive(Debug)]
pub struct FileProfileStore {
    base_path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileProfileStore {
    /// Create a store rooted at `base_path`.
    ///
    /// # Example
    /// ```ignore
    /// let store = FileProfileStore::new("./.rate-concierge");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn profile_path(&self) -> PathBuf {
        self.base_path.join("profile.yaml")
    }

    async fn load(&self) -> Result<LocalProfile, ProfileStoreError> {
        let path = self.profile_path();
        if !path.exists() {
            return Ok(LocalProfile::default());
        }

        let yaml = fs::read_to_string(&path)
            .await
            .map_err(|e| ProfileStoreError::Io(e.to_string()))?;
        serde_yaml::from_str(&yaml).map_err(|e| ProfileStoreError::Deserialization(e.to_string()))
    }

    async fn save(&self, profile: &LocalProfile) -> Result<(), ProfileStoreError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| ProfileStoreError::Io(e.to_string()))?;

        let yaml = serde_yaml::to_string(profile)
            .map_err(|e| ProfileStoreError::Serialization(e.to_string()))?;
        fs::write(self.profile_path(), yaml)
            .await
            .map_err(|e| ProfileStoreError::Io(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for FileProfileStore {
    async fn user_id(&self) -> Result<UserId, ProfileStoreError> {
        let _guard = self.lock.lock().await;
        let mut profile = self.load().await?;
        if let Some(user_id) = &profile.user_id {
            return Ok(user_id.clone());
        }

        let user_id = UserId::anonymous();
        tracing::info!(user_id = %user_id, "Generated anonymous user id");
        profile.user_id = Some(user_id.clone());
        self.save(&profile).await?;
        Ok(user_id)
    }

    async fn set_user_id(&self, user_id: UserId) -> Result<(), ProfileStoreError> {
        let _guard = self.lock.lock().await;
        let mut profile = self.load().await?;
        profile.user_id = Some(user_id);
        self.save(&profile).await
    }
}

#[async_trait]
impl HistoryStore for FileProfileStore {
    async fn recent_searches(&self) -> Result<Vec<String>, ProfileStoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.recent_searches)
    }

    async fn record_search(&self, hotel_name: &str) -> Result<(), ProfileStoreError> {
        let _guard = self.lock.lock().await;
        let mut profile = self.load().await?;
        push_history(&mut profile.recent_searches, hotel_name);
        self.save(&profile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn user_id_is_generated_once_and_persisted() {
        let dir = TempDir::new().unwrap();
        let store = FileProfileStore::new(dir.path());

        let first = store.user_id().await.unwrap();
        assert!(first.as_str().starts_with("anon-"));

        let reopened = FileProfileStore::new(dir.path());
        assert_eq!(reopened.user_id().await.unwrap(), first);
    }

    #[tokio::test]
    async fn set_user_id_overrides_anonymous() {
        let dir = TempDir::new().unwrap();
        let store = FileProfileStore::new(dir.path());
        store.user_id().await.unwrap();

        store.set_user_id(UserId::new("member-7").unwrap()).await.unwrap();
        assert_eq!(store.user_id().await.unwrap().as_str(), "member-7");
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let store = FileProfileStore::new(dir.path().join("nested"));
        store.record_search("Aman Tokyo").await.unwrap();
        store.record_search("Raffles Singapore").await.unwrap();
        store.record_search("Aman Tokyo").await.unwrap();

        let reopened = FileProfileStore::new(dir.path().join("nested"));
        assert_eq!(
            reopened.recent_searches().await.unwrap(),
            vec!["Aman Tokyo".to_string(), "Raffles Singapore".to_string()]
        );
    }

    #[tokio::test]
    async fn corrupt_file_is_a_deserialization_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("profile.yaml"), "recent_searches: [unclosed").unwrap();
        let store = FileProfileStore::new(dir.path());

        assert!(matches!(
            store.recent_searches().await,
            Err(ProfileStoreError::Deserialization(_))
        ));
    }
}
