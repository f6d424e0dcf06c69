//! Process-local TTL cache.
//!
//! Entries hold the value and the instant it was stored; an entry is fresh
//! while its age is below the TTL. Expired entries are skipped on read and
//! dropped by a linear scan in [`TtlCache::purge_expired`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::infra::metrics;

#[derive(Debug, Clone)]
struct Entry<V> {
    data: V,
    stored_at: Instant,
}

#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, Entry<V>>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(|err| err.into_inner());
        let value = entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.data.clone());
        metrics::cache_lookup(self.name, value.is_some());
        value
    }

    pub fn insert(&self, key: impl Into<String>, data: V) {
        let mut entries = self.entries.write().unwrap_or_else(|err| err.into_inner());
        entries.insert(
            key.into(),
            Entry {
                data,
                stored_at: Instant::now(),
            },
        );
    }

    /// Returns the cached value or runs `load` and caches its success.
    /// Errors are passed through and nothing is stored.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = load().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|err| err.into_inner());
        entries.remove(key);
    }

    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|err| err.into_inner());
        entries.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|err| err.into_inner());
        entries.clear();
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|err| err.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn start_purge_loop(&self, interval: Duration) {
        let cache = self.clone();
        tokio::spawn(async move {
            let interval = interval.max(Duration::from_secs(1));
            loop {
                tokio::time::sleep(interval).await;
                let purged = cache.purge_expired();
                if purged > 0 {
                    tracing::debug!(event = "cache_purged", cache = cache.name, purged);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fresh_entries_are_returned() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.insert("banners:popup", vec![1, 2, 3]);
        assert_eq!(cache.get("banners:popup"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get("banners:top"), None);
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = TtlCache::new("test", Duration::ZERO);
        cache.insert("key", 1);
        assert_eq!(cache.get("key"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn purge_keeps_fresh_entries() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_by_key_and_prefix() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        cache.insert("banners:popup", 1);
        cache.insert("banners:top", 2);
        cache.insert("settings", 3);
        cache.invalidate("settings");
        assert_eq!(cache.get("settings"), None);
        cache.invalidate_prefix("banners:");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn loader_runs_once_while_fresh() {
        let cache = TtlCache::new("test", Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value: Result<i32, ()> = cache
                .get_or_try_insert_with("key", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await;
            assert_eq!(value, Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn loader_errors_are_not_cached() {
        let cache: TtlCache<i32> = TtlCache::new("test", Duration::from_secs(60));
        let failed: Result<i32, &str> = cache
            .get_or_try_insert_with("key", || async { Err("db down") })
            .await;
        assert_eq!(failed, Err("db down"));
        assert!(cache.is_empty());
    }
}
