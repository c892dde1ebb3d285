//! HTTP Thread Store - Implementation of ThreadStore over the persistence REST API.
//!
//! # Endpoints
//!
//! - `POST/GET /threads`
//! - `GET/PATCH/DELETE /threads/:id`
//! - `GET/POST /threads/:id/messages`
//!
//! Requests carry the user id in `X-User-Id` and, when configured, a bearer
//! token.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::domain::conversation::{NewThread, Thread, ThreadPatch};
use crate::domain::foundation::{ThreadId, UserId};
use crate::ports::{NewMessage, StoreError, StoredMessage, ThreadStore};

const USER_HEADER: &str = "X-User-Id";

/// Configuration for the persistence client.
#[derive(Debug, Clone)]
pub struct HttpThreadStoreConfig {
    pub base_url: String,
    api_token: Option<Secret<String>>,
    pub timeout: Duration,
}

impl HttpThreadStoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_token(mut self, token: Secret<String>) -> Self {
        self.api_token = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Persistence service client.
pub struct HttpThreadStore {
    config: HttpThreadStoreConfig,
    client: Client,
}

impl HttpThreadStore {
    pub fn new(config: HttpThreadStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn threads_url(&self) -> String {
        format!("{}/threads", self.config.base_url)
    }

    fn thread_url(&self, thread_id: &ThreadId) -> String {
        format!("{}/threads/{}", self.config.base_url, thread_id)
    }

    fn messages_url(&self, thread_id: &ThreadId) -> String {
        format!("{}/threads/{}/messages", self.config.base_url, thread_id)
    }

    fn authorize(&self, builder: RequestBuilder, user_id: &UserId) -> RequestBuilder {
        let builder = builder.header(USER_HEADER, user_id.as_str());
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, thread_id: Option<&ThreadId>) -> Result<Response, StoreError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::network(format!("request timed out: {}", e))
            } else {
                StoreError::network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, thread_id, body))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        let body = response.text().await.map_err(|e| StoreError::network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| StoreError::decode(e.to_string()))
    }
}

/// Maps a non-success status to a store error.
fn map_status(status: StatusCode, thread_id: Option<&ThreadId>, body: String) -> StoreError {
    match (status, thread_id) {
        (StatusCode::UNAUTHORIZED, _) => StoreError::Unauthorized,
        (StatusCode::FORBIDDEN, Some(id)) => StoreError::Forbidden(id.clone()),
        (StatusCode::NOT_FOUND, Some(id)) => StoreError::NotFound(id.clone()),
        _ => StoreError::Server {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl ThreadStore for HttpThreadStore {
    async fn create_thread(&self, user_id: &UserId, thread: NewThread) -> Result<Thread, StoreError> {
        let request = self.authorize(self.client.post(self.threads_url()), user_id).json(&thread);
        Self::decode(self.send(request, None).await?).await
    }

    async fn list_threads(&self, user_id: &UserId) -> Result<Vec<Thread>, StoreError> {
        let request = self.authorize(self.client.get(self.threads_url()), user_id);
        Self::decode(self.send(request, None).await?).await
    }

    async fn get_thread(&self, user_id: &UserId, thread_id: &ThreadId) -> Result<Thread, StoreError> {
        let request = self.authorize(self.client.get(self.thread_url(thread_id)), user_id);
        Self::decode(self.send(request, Some(thread_id)).await?).await
    }

    async fn update_thread(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
        patch: ThreadPatch,
    ) -> Result<Thread, StoreError> {
        let request = self
            .authorize(self.client.patch(self.thread_url(thread_id)), user_id)
            .json(&patch);
        Self::decode(self.send(request, Some(thread_id)).await?).await
    }

    async fn delete_thread(&self, user_id: &UserId, thread_id: &ThreadId) -> Result<(), StoreError> {
        let request = self.authorize(self.client.delete(self.thread_url(thread_id)), user_id);
        self.send(request, Some(thread_id)).await?;
        Ok(())
    }

    async fn list_messages(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let request = self.authorize(self.client.get(self.messages_url(thread_id)), user_id);
        Self::decode(self.send(request, Some(thread_id)).await?).await
    }

    async fn add_message(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
        message: NewMessage,
    ) -> Result<StoredMessage, StoreError> {
        let request = self
            .authorize(self.client.post(self.messages_url(thread_id)), user_id)
            .json(&message);
        Self::decode(self.send(request, Some(thread_id)).await?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread_id() -> ThreadId {
        ThreadId::new("t-42").unwrap()
    }

    #[test]
    fn status_mapping_follows_ownership_rules() {
        let id = thread_id();
        assert_eq!(
            map_status(StatusCode::UNAUTHORIZED, Some(&id), String::new()),
            StoreError::Unauthorized
        );
        assert_eq!(
            map_status(StatusCode::FORBIDDEN, Some(&id), String::new()),
            StoreError::Forbidden(id.clone())
        );
        assert_eq!(
            map_status(StatusCode::NOT_FOUND, Some(&id), String::new()),
            StoreError::NotFound(id.clone())
        );
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, Some(&id), "upstream".into()),
            StoreError::Server { status: 502, .. }
        ));
    }

    #[test]
    fn urls_are_built_from_base() {
        let store = HttpThreadStore::new(HttpThreadStoreConfig::new("http://db.local/api/")).unwrap();
        assert_eq!(store.threads_url(), "http://db.local/api/threads");
        assert_eq!(store.thread_url(&thread_id()), "http://db.local/api/threads/t-42");
        assert_eq!(
            store.messages_url(&thread_id()),
            "http://db.local/api/threads/t-42/messages"
        );
    }

    #[test]
    fn config_keeps_token_secret() {
        let config = HttpThreadStoreConfig::new("http://db.local")
            .with_api_token(Secret::new("s3cret".to_string()));
        assert!(!format!("{:?}", config).contains("s3cret"));
    }
}
