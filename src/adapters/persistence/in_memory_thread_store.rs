//! In-Memory Thread Store Adapter
//!
//! Enforces the same ownership rules as the persistence service and can be
//! told to fail specific operations. Useful for testing and offline runs.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::conversation::{NewThread, Thread, ThreadPatch};
use crate::domain::foundation::{ThreadId, Timestamp, UserId};
use crate::ports::{NewMessage, StoreError, StoredMessage, ThreadStore};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    CreateThread,
    ListThreads,
    GetThread,
    UpdateThread,
    DeleteThread,
    ListMessages,
    AddMessage,
}

/// In-memory thread and message storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryThreadStore {
    threads: Arc<RwLock<HashMap<ThreadId, Thread>>>,
    messages: Arc<RwLock<HashMap<ThreadId, Vec<StoredMessage>>>>,
    failing: Arc<RwLock<HashSet<StoreOperation>>>,
    delays: Arc<RwLock<HashMap<StoreOperation, Duration>>>,
    unauthenticated: Arc<AtomicBool>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `operation` fail with a server error until [`Self::recover`].
    pub async fn fail_on(&self, operation: StoreOperation) {
        self.failing.write().await.insert(operation);
    }

    pub async fn recover(&self, operation: StoreOperation) {
        self.failing.write().await.remove(&operation);
    }

    /// Makes `operation` take `delay` before it runs.
    pub async fn delay_on(&self, operation: StoreOperation, delay: Duration) {
        self.delays.write().await.insert(operation, delay);
    }

    /// Rejects every call with `Unauthorized` while set.
    pub fn set_unauthenticated(&self, unauthenticated: bool) {
        self.unauthenticated.store(unauthenticated, Ordering::SeqCst);
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }

    pub async fn message_count(&self, thread_id: &ThreadId) -> usize {
        self.messages
            .read()
            .await
            .get(thread_id)
            .map_or(0, Vec::len)
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn check(&self, operation: StoreOperation) -> Result<(), StoreError> {
        let delay = self.delays.read().await.get(&operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unauthenticated.load(Ordering::SeqCst) {
            return Err(StoreError::Unauthorized);
        }
        if self.failing.read().await.contains(&operation) {
            return Err(StoreError::Server {
                status: 500,
                message: format!("injected failure: {:?}", operation),
            });
        }
        Ok(())
    }

    /// 404 before 403, like the service.
    fn owned<'a>(
        threads: &'a HashMap<ThreadId, Thread>,
        user_id: &UserId,
        thread_id: &ThreadId,
    ) -> Result<&'a Thread, StoreError> {
        let thread = threads
            .get(thread_id)
            .ok_or_else(|| StoreError::NotFound(thread_id.clone()))?;
        if &thread.user_id != user_id {
            return Err(StoreError::Forbidden(thread_id.clone()));
        }
        Ok(thread)
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn create_thread(&self, user_id: &UserId, thread: NewThread) -> Result<Thread, StoreError> {
        self.check(StoreOperation::CreateThread).await?;

        let id = ThreadId::new(self.next_id("thread")).map_err(|e| StoreError::decode(e.to_string()))?;
        let now = Timestamp::now();
        let created = Thread {
            id: id.clone(),
            user_id: user_id.clone(),
            hotel_name: thread.hotel_name,
            hotel_id: thread.hotel_id,
            check_in: thread.check_in,
            check_out: thread.check_out,
            metadata: thread.metadata,
            title: thread.title,
            created_at: now,
            updated_at: now,
        };
        self.threads.write().await.insert(id, created.clone());
        Ok(created)
    }

    async fn list_threads(&self, user_id: &UserId) -> Result<Vec<Thread>, StoreError> {
        self.check(StoreOperation::ListThreads).await?;

        let mut threads: Vec<Thread> = self
            .threads
            .read()
            .await
            .values()
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));
        Ok(threads)
    }

    async fn get_thread(&self, user_id: &UserId, thread_id: &ThreadId) -> Result<Thread, StoreError> {
        self.check(StoreOperation::GetThread).await?;
        let threads = self.threads.read().await;
        Self::owned(&threads, user_id, thread_id).cloned()
    }

    async fn update_thread(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
        patch: ThreadPatch,
    ) -> Result<Thread, StoreError> {
        self.check(StoreOperation::UpdateThread).await?;
        let mut threads = self.threads.write().await;
        Self::owned(&threads, user_id, thread_id)?;

        let thread = threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::NotFound(thread_id.clone()))?;
        thread.apply_patch(&patch, Timestamp::now());
        Ok(thread.clone())
    }

    async fn delete_thread(&self, user_id: &UserId, thread_id: &ThreadId) -> Result<(), StoreError> {
        self.check(StoreOperation::DeleteThread).await?;
        let mut threads = self.threads.write().await;
        Self::owned(&threads, user_id, thread_id)?;

        threads.remove(thread_id);
        self.messages.write().await.remove(thread_id);
        Ok(())
    }

    async fn list_messages(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        self.check(StoreOperation::ListMessages).await?;
        {
            let threads = self.threads.read().await;
            Self::owned(&threads, user_id, thread_id)?;
        }
        let mut messages = self
            .messages
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn add_message(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
        message: NewMessage,
    ) -> Result<StoredMessage, StoreError> {
        self.check(StoreOperation::AddMessage).await?;
        let mut threads = self.threads.write().await;
        Self::owned(&threads, user_id, thread_id)?;

        let now = Timestamp::now();
        let stored = StoredMessage {
            id: self.next_id("msg"),
            thread_id: thread_id.clone(),
            role: message.role,
            content: message.content,
            created_at: now,
        };
        self.messages
            .write()
            .await
            .entry(thread_id.clone())
            .or_default()
            .push(stored.clone());
        if let Some(thread) = threads.get_mut(thread_id) {
            thread.updated_at = now;
        }
        Ok(stored)
    }
}
