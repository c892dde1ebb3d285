//! Read-through cache with optional freshness window.
//!
//! Readers load through [`ReadThroughCache::get_or_load`]. Every write to a
//! key (`put`, `update`, `invalidate`) bumps that key's generation; a load
//! only stores its result when the generation it started under is still
//! current, so a slow read never resurrects a value a writer replaced or
//! dropped in the meantime.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

#[derive(Debug)]
struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    generations: HashMap<K, u64>,
}

impl<K: Eq + Hash + Clone, V> CacheState<K, V> {
    fn generation(&self, key: &K) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: &K) {
        *self.generations.entry(key.clone()).or_insert(0) += 1;
    }
}

/// Keyed cache. With `ttl = None` entries stay fresh until invalidated.
#[derive(Debug)]
pub struct ReadThroughCache<K, V> {
    state: RwLock<CacheState<K, V>>,
    ttl: Option<Duration>,
}

impl<K, V> ReadThroughCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                generations: HashMap::new(),
            }),
            ttl,
        }
    }

    /// Entries never go stale on their own.
    pub fn until_invalidated() -> Self {
        Self::new(None)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(Some(ttl))
    }

    fn is_fresh(&self, entry: &CacheEntry<V>) -> bool {
        self.ttl.map_or(true, |ttl| entry.stored_at.elapsed() < ttl)
    }

    /// Fresh value, if any.
    pub async fn get(&self, key: &K) -> Option<V> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|e| self.is_fresh(e))
            .map(|e| e.value.clone())
    }

    /// Cached value regardless of freshness.
    pub async fn peek(&self, key: &K) -> Option<V> {
        self.state.read().await.entries.get(key).map(|e| e.value.clone())
    }

    /// Returns the fresh value or loads and returns a new one. The loaded
    /// value is cached only if no write touched `key` while loading. Load
    /// errors are returned and nothing is cached.
    pub async fn get_or_load<E, F, Fut>(&self, key: &K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let generation = {
            let state = self.state.read().await;
            if let Some(entry) = state.entries.get(key).filter(|e| self.is_fresh(e)) {
                return Ok(entry.value.clone());
            }
            state.generation(key)
        };

        let value = load().await?;

        let mut state = self.state.write().await;
        if state.generation(key) == generation {
            state.entries.insert(
                key.clone(),
                CacheEntry {
                    value: value.clone(),
                    stored_at: Instant::now(),
                },
            );
        } else {
            tracing::debug!("Cache key changed during load, result not stored");
        }
        Ok(value)
    }

    pub async fn put(&self, key: K, value: V) {
        let mut state = self.state.write().await;
        state.bump(&key);
        state.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self, key: &K) {
        let mut state = self.state.write().await;
        state.bump(key);
        state.entries.remove(key);
    }

    /// Mutates a cached value in place without touching its age.
    /// Returns false when nothing is cached for `key`.
    pub async fn update<F>(&self, key: &K, mutate: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        let mut state = self.state.write().await;
        state.bump(key);
        match state.entries.get_mut(key) {
            Some(entry) => {
                mutate(&mut entry.value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn loads_once_while_fresh() {
        let cache: ReadThroughCache<&str, u32> = ReadThroughCache::with_ttl(Duration::from_secs(30));
        let counter = AtomicUsize::new(0);
        let loads = &counter;
        let load = || async move {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(7)
        };

        assert_eq!(cache.get_or_load(&"k", load).await, Ok(7));
        assert_eq!(cache.get_or_load(&"k", load).await, Ok(7));
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get(&"k").await, None);
        assert_eq!(cache.peek(&"k").await, Some(7));
        cache.get_or_load(&"k", load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn load_errors_are_not_cached() {
        let cache: ReadThroughCache<&str, u32> = ReadThroughCache::until_invalidated();
        let result = cache.get_or_load(&"k", || async { Err::<u32, _>("down") }).await;
        assert_eq!(result, Err("down"));
        assert_eq!(cache.peek(&"k").await, None);
    }

    #[tokio::test]
    async fn update_mutates_in_place() {
        let cache: ReadThroughCache<&str, Vec<u32>> = ReadThroughCache::until_invalidated();
        assert!(!cache.update(&"k", |v| v.push(1)).await);

        cache.put("k", vec![1, 2, 3]).await;
        assert!(cache.update(&"k", |v| v.retain(|x| *x != 2)).await);
        assert_eq!(cache.get(&"k").await, Some(vec![1, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn load_overtaken_by_invalidate_is_not_stored() {
        let cache: ReadThroughCache<&str, u32> = ReadThroughCache::until_invalidated();
        let slow_load = cache.get_or_load(&"k", || async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, ()>(1)
        });
        let writer = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            cache.invalidate(&"k").await;
        };

        let (loaded, ()) = tokio::join!(slow_load, writer);

        assert_eq!(loaded, Ok(1));
        assert_eq!(cache.peek(&"k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn load_overtaken_by_put_keeps_newer_value() {
        let cache: ReadThroughCache<&str, u32> = ReadThroughCache::until_invalidated();
        let slow_load = cache.get_or_load(&"k", || async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, ()>(1)
        });
        let writer = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            cache.put("k", 2).await;
        };

        tokio::join!(slow_load, writer);

        assert_eq!(cache.get(&"k").await, Some(2));
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cache: ReadThroughCache<&str, u32> = ReadThroughCache::until_invalidated();
        cache.put("k", 1).await;
        cache.invalidate(&"k").await;
        assert_eq!(cache.get(&"k").await, None);
        assert!(!cache.update(&"k", |v| *v += 1).await);
    }
}
