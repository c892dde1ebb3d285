//! Thread repository - caching layer over the [`ThreadStore`] port.
//!
//! # Cache Semantics
//!
//! - thread lists are fresh for 30 seconds per user
//! - thread details and messages stay cached until a mutation invalidates them
//! - comparison contexts are cached for a short window, and only when present
//!   and unexpired
//! - `delete_thread` is optimistic: the thread disappears from the cached list
//!   at once and is put back at its old position if the server refuses.
//!   Only that thread is restored, so concurrent deletes cannot undo each
//!   other's rollback

use std::sync::Arc;
use std::time::Duration;

use super::cache::ReadThroughCache;
use crate::domain::comparison::ComparisonContext;
use crate::domain::conversation::{Message, NewThread, Thread, ThreadPatch};
use crate::domain::foundation::{ThreadId, UserId};
use crate::ports::{Clock, NewMessage, Notice, StoreError, ThreadStore, UserNotifier};

/// Freshness windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryTtls {
    pub thread_list: Duration,
    pub comparison_context: Duration,
}

impl Default for RepositoryTtls {
    fn default() -> Self {
        Self {
            thread_list: Duration::from_secs(30),
            comparison_context: Duration::from_secs(15),
        }
    }
}

pub struct ThreadRepository {
    store: Arc<dyn ThreadStore>,
    notifier: Arc<dyn UserNotifier>,
    clock: Arc<dyn Clock>,
    thread_lists: ReadThroughCache<UserId, Vec<Thread>>,
    threads: ReadThroughCache<ThreadId, Thread>,
    messages: ReadThroughCache<ThreadId, Vec<Message>>,
    contexts: ReadThroughCache<ThreadId, ComparisonContext>,
}

impl ThreadRepository {
    pub fn new(
        store: Arc<dyn ThreadStore>,
        notifier: Arc<dyn UserNotifier>,
        clock: Arc<dyn Clock>,
        ttls: RepositoryTtls,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            thread_lists: ReadThroughCache::with_ttl(ttls.thread_list),
            threads: ReadThroughCache::until_invalidated(),
            messages: ReadThroughCache::until_invalidated(),
            contexts: ReadThroughCache::with_ttl(ttls.comparison_context),
        }
    }

    pub async fn create_thread(&self, user_id: &UserId, thread: NewThread) -> Result<Thread, StoreError> {
        let created = self.store.create_thread(user_id, thread).await?;
        tracing::info!(user_id = %user_id, thread_id = %created.id, "Thread created");

        self.threads.put(created.id.clone(), created.clone()).await;
        self.thread_lists.invalidate(user_id).await;
        Ok(created)
    }

    /// Persists one message. System notices are never stored.
    pub async fn save_message(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
        message: &Message,
    ) -> Result<Message, StoreError> {
        if !message.is_persistable() {
            return Ok(message.clone());
        }

        let stored = self
            .store
            .add_message(
                user_id,
                thread_id,
                NewMessage {
                    role: message.role,
                    content: message.content.clone(),
                },
            )
            .await?;
        tracing::debug!(thread_id = %thread_id, role = message.role.as_str(), "Message saved");

        self.messages.invalidate(thread_id).await;
        self.threads.invalidate(thread_id).await;
        self.thread_lists.invalidate(user_id).await;
        Ok(stored.into_message())
    }

    /// Merges `patch` into the thread, typically to snapshot the latest
    /// comparison.
    pub async fn update_thread(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
        patch: ThreadPatch,
    ) -> Result<Thread, StoreError> {
        let updated = self.store.update_thread(user_id, thread_id, patch).await?;

        self.threads.put(thread_id.clone(), updated.clone()).await;
        self.contexts.invalidate(thread_id).await;
        self.thread_lists.invalidate(user_id).await;
        Ok(updated)
    }

    /// Optimistic delete. On failure the thread is put back into the cached
    /// list and a [`Notice::DeleteFailed`] is raised.
    pub async fn delete_thread(&self, user_id: &UserId, thread_id: &ThreadId) -> Result<(), StoreError> {
        let mut removed = None;
        self.thread_lists
            .update(user_id, |threads| {
                if let Some(index) = threads.iter().position(|t| &t.id == thread_id) {
                    removed = Some((index, threads.remove(index)));
                }
            })
            .await;

        match self.store.delete_thread(user_id, thread_id).await {
            Ok(()) => {
                tracing::info!(user_id = %user_id, thread_id = %thread_id, "Thread deleted");
                self.thread_lists.invalidate(user_id).await;
                self.threads.invalidate(thread_id).await;
                self.messages.invalidate(thread_id).await;
                self.contexts.invalidate(thread_id).await;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %user_id,
                    thread_id = %thread_id,
                    error = %err,
                    "Thread delete failed, restoring list"
                );
                if let Some((index, thread)) = removed {
                    self.thread_lists
                        .update(user_id, |threads| {
                            if !threads.iter().any(|t| t.id == thread.id) {
                                threads.insert(index.min(threads.len()), thread);
                            }
                        })
                        .await;
                }
                self.notifier.notify(Notice::DeleteFailed {
                    thread_id: thread_id.clone(),
                });
                Err(err)
            }
        }
    }

    /// Deletes a thread the user never saw. No optimistic list update and no
    /// notice.
    pub async fn discard_thread(&self, user_id: &UserId, thread_id: &ThreadId) -> Result<(), StoreError> {
        self.store.delete_thread(user_id, thread_id).await?;
        tracing::info!(user_id = %user_id, thread_id = %thread_id, "Thread discarded");
        self.thread_lists.invalidate(user_id).await;
        self.threads.invalidate(thread_id).await;
        Ok(())
    }

    pub async fn list_threads(&self, user_id: &UserId) -> Result<Vec<Thread>, StoreError> {
        self.thread_lists
            .get_or_load(user_id, || self.store.list_threads(user_id))
            .await
    }

    /// The cached list as last seen, fresh or not.
    pub async fn cached_threads(&self, user_id: &UserId) -> Option<Vec<Thread>> {
        self.thread_lists.peek(user_id).await
    }

    pub async fn get_thread(&self, user_id: &UserId, thread_id: &ThreadId) -> Result<Thread, StoreError> {
        self.threads
            .get_or_load(thread_id, || self.store.get_thread(user_id, thread_id))
            .await
    }

    pub async fn list_messages(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
    ) -> Result<Vec<Message>, StoreError> {
        self.messages
            .get_or_load(thread_id, || async {
                let stored = self.store.list_messages(user_id, thread_id).await?;
                Ok(stored.into_iter().map(|m| m.into_message()).collect())
            })
            .await
    }

    /// The thread's latest comparison, recomputed from its metadata. `None`
    /// when there is none or it has expired.
    pub async fn comparison_context(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
    ) -> Result<Option<ComparisonContext>, StoreError> {
        let now = self.clock.now();
        if let Some(context) = self.contexts.get(thread_id).await {
            if !context.is_expired_at(now) {
                return Ok(Some(context));
            }
        }

        let thread = self.get_thread(user_id, thread_id).await?;
        let context = thread
            .comparison_context()
            .filter(|context| !context.is_expired_at(now));

        match &context {
            Some(context) => self.contexts.put(thread_id.clone(), context.clone()).await,
            None => self.contexts.invalidate(thread_id).await,
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notify::ChannelNotifier;
    use crate::adapters::persistence::{InMemoryThreadStore, StoreOperation};
    use crate::domain::comparison::{metadata_snapshot, Evaluation};
    use crate::domain::conversation::MessageRole;
    use crate::ports::FixedClock;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::collections::HashSet;

    struct Fixture {
        store: InMemoryThreadStore,
        notifier: ChannelNotifier,
        repo: ThreadRepository,
        user: UserId,
    }

    fn fixture() -> Fixture {
        let store = InMemoryThreadStore::new();
        let notifier = ChannelNotifier::new();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap());
        let repo = ThreadRepository::new(
            Arc::new(store.clone()),
            Arc::new(notifier.clone()),
            Arc::new(clock),
            RepositoryTtls::default(),
        );
        Fixture {
            store,
            notifier,
            repo,
            user: UserId::new("traveler").unwrap(),
        }
    }

    fn new_thread(name: &str) -> NewThread {
        NewThread {
            hotel_name: name.into(),
            hotel_id: None,
            check_in: NaiveDate::from_ymd_opt(2030, 6, 10),
            check_out: NaiveDate::from_ymd_opt(2030, 6, 13),
            title: name.into(),
            metadata: Default::default(),
        }
    }

    fn ids(threads: &[Thread]) -> HashSet<ThreadId> {
        threads.iter().map(|t| t.id.clone()).collect()
    }

    #[tokio::test]
    async fn create_thread_refreshes_list() {
        let f = fixture();
        assert!(f.repo.list_threads(&f.user).await.unwrap().is_empty());

        f.repo.create_thread(&f.user, new_thread("Aman")).await.unwrap();
        assert_eq!(f.repo.list_threads(&f.user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_restores_list_and_notifies() {
        let f = fixture();
        let a = f.repo.create_thread(&f.user, new_thread("Aman")).await.unwrap();
        f.repo.create_thread(&f.user, new_thread("Raffles")).await.unwrap();
        let before = f.repo.list_threads(&f.user).await.unwrap();

        f.store.fail_on(StoreOperation::DeleteThread).await;
        let err = f.repo.delete_thread(&f.user, &a.id).await.unwrap_err();

        assert!(matches!(err, StoreError::Server { .. }));
        let after = f.repo.cached_threads(&f.user).await.unwrap();
        assert_eq!(ids(&after), ids(&before));
        assert_eq!(
            f.notifier.drain(),
            vec![Notice::DeleteFailed { thread_id: a.id.clone() }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_failed_deletes_restore_every_thread() {
        let f = fixture();
        let a = f.repo.create_thread(&f.user, new_thread("Aman")).await.unwrap();
        let b = f.repo.create_thread(&f.user, new_thread("Raffles")).await.unwrap();
        f.repo.create_thread(&f.user, new_thread("Sacher")).await.unwrap();
        let before = f.repo.list_threads(&f.user).await.unwrap();

        f.store.fail_on(StoreOperation::DeleteThread).await;
        f.store
            .delay_on(StoreOperation::DeleteThread, Duration::from_millis(10))
            .await;
        let first = f.repo.delete_thread(&f.user, &a.id);
        let second = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            f.repo.delete_thread(&f.user, &b.id).await
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_err());
        assert!(second.is_err());
        let after = f.repo.cached_threads(&f.user).await.unwrap();
        assert_eq!(after.len(), before.len());
        assert_eq!(ids(&after), ids(&before));
        assert_eq!(f.notifier.drain().len(), 2);
    }

    #[tokio::test]
    async fn successful_delete_removes_thread() {
        let f = fixture();
        let a = f.repo.create_thread(&f.user, new_thread("Aman")).await.unwrap();
        f.repo.list_threads(&f.user).await.unwrap();

        f.repo.delete_thread(&f.user, &a.id).await.unwrap();
        assert!(f.repo.list_threads(&f.user).await.unwrap().is_empty());
        assert!(f.notifier.drain().is_empty());
    }

    #[tokio::test]
    async fn delete_of_foreign_thread_is_forbidden_and_rolled_back() {
        let f = fixture();
        let other = UserId::new("someone-else").unwrap();
        let theirs = f.repo.create_thread(&other, new_thread("Aman")).await.unwrap();
        f.repo.create_thread(&f.user, new_thread("Raffles")).await.unwrap();
        let before = f.repo.list_threads(&f.user).await.unwrap();

        let err = f.repo.delete_thread(&f.user, &theirs.id).await.unwrap_err();
        assert_eq!(err, StoreError::Forbidden(theirs.id.clone()));
        assert_eq!(ids(&f.repo.cached_threads(&f.user).await.unwrap()), ids(&before));
    }

    #[tokio::test]
    async fn saved_messages_are_listed_in_order() {
        let f = fixture();
        let t = f.repo.create_thread(&f.user, new_thread("Aman")).await.unwrap();
        assert!(f.repo.list_messages(&f.user, &t.id).await.unwrap().is_empty());

        f.repo.save_message(&f.user, &t.id, &Message::user("hi")).await.unwrap();
        f.repo.save_message(&f.user, &t.id, &Message::assistant("hello")).await.unwrap();
        f.repo.save_message(&f.user, &t.id, &Message::system("working")).await.unwrap();

        let messages = f.repo.list_messages(&f.user, &t.id).await.unwrap();
        let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
    }

    #[tokio::test]
    async fn comparison_context_comes_from_metadata_snapshot() {
        let f = fixture();
        let t = f.repo.create_thread(&f.user, new_thread("Aman")).await.unwrap();
        assert!(f.repo.comparison_context(&f.user, &t.id).await.unwrap().is_none());

        let evaluation = Evaluation::parse(
            r#"{"hotel_name":"Aman","checkin_date":"2030-06-10","checkout_date":"2030-06-13",
                "table_rows":[{"platform":"Direct","price":900}]}"#,
        )
        .unwrap();
        let patch = ThreadPatch::metadata(metadata_snapshot(&evaluation, Utc::now()));
        f.repo.update_thread(&f.user, &t.id, patch).await.unwrap();

        let context = f.repo.comparison_context(&f.user, &t.id).await.unwrap().unwrap();
        assert_eq!(context.hotel_name, "Aman");
        assert_eq!(context.table_rows_summary.len(), 1);
    }

    #[tokio::test]
    async fn expired_context_is_not_returned() {
        let f = fixture();
        let t = f.repo.create_thread(&f.user, new_thread("Aman")).await.unwrap();
        let evaluation = Evaluation::parse(
            r#"{"hotel_name":"Aman","checkin_date":"2030-05-01","table_rows":[{"platform":"Direct","price":900}]}"#,
        )
        .unwrap();
        let patch = ThreadPatch::metadata(metadata_snapshot(&evaluation, Utc::now()));
        f.repo.update_thread(&f.user, &t.id, patch).await.unwrap();

        assert!(f.repo.comparison_context(&f.user, &t.id).await.unwrap().is_none());
    }
}
