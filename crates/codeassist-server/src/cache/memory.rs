//! In-memory cache implementation with TTL support
//!
//! Expiry is lazy: entries past their deadline are invisible to readers and
//! removed on the next access or write that touches the store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::time::Instant;

use super::config::{DEFAULT_MAX_VALUE_SIZE, MAX_ENTRY_TTL};
use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::provider::{CacheProvider, CacheStats};

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe in-memory cache with TTL support
///
/// Uses the tokio clock, so a paused test runtime controls expiry.
///
/// When `max_entries` is reached, expired entries are purged first; if the
/// store is still full, the entry closest to expiry is evicted.
#[derive(Clone)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    max_entries: Option<usize>,
    max_value_size: usize,
    up_since: DateTime<Utc>,
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("max_entries", &self.max_entries)
            .field("max_value_size", &self.max_value_size)
            .field("entry_count", &self.store.read().len())
            .finish_non_exhaustive()
    }
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            max_entries: None,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
            up_since: Utc::now(),
        }
    }

    #[must_use]
    pub const fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    #[must_use]
    pub const fn with_max_value_size(mut self, max: usize) -> Self {
        self.max_value_size = max;
        self
    }

    /// Drop `key` only if the entry stored under it is still expired at `now`.
    ///
    /// A writer may have replaced the entry between the caller's read and
    /// this write lock; the fresh entry must survive.
    fn remove_if_expired(&self, key: &str, now: Instant) {
        let mut store = self.store.write();
        if store.get(key).is_some_and(|entry| entry.is_expired(now)) {
            store.remove(key);
        }
    }

    fn purge_expired(store: &mut HashMap<String, CacheEntry>, now: Instant) {
        store.retain(|_, entry| !entry.is_expired(now));
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheProvider for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let store = self.store.read();

        match store.get(key.as_str()) {
            Some(entry) if !entry.is_expired(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                drop(store);
                self.remove_if_expired(key.as_str(), now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> CacheResult<()> {
        if value.len() > self.max_value_size {
            return Err(CacheError::ValueTooLarge {
                size: value.len(),
                max: self.max_value_size,
            });
        }

        let now = Instant::now();
        let entry = CacheEntry {
            value: value.to_vec(),
            expires_at: now + ttl.min(MAX_ENTRY_TTL),
        };

        let mut store = self.store.write();

        if let Some(max) = self.max_entries
            && store.len() >= max
            && !store.contains_key(key.as_str())
        {
            Self::purge_expired(&mut store, now);
            if store.len() >= max
                && let Some(victim) = store
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at)
                    .map(|(k, _)| k.clone())
            {
                store.remove(&victim);
            }
        }

        store.insert(key.as_str().to_string(), entry);
        Ok(())
    }

    async fn clear(&self) -> CacheResult<u64> {
        let now = Instant::now();
        let mut store = self.store.write();
        let live = store.values().filter(|e| !e.is_expired(now)).count() as u64;
        store.clear();
        Ok(live)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let now = Instant::now();
        let store = self.store.read();

        let (total_keys, memory_bytes) = store
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .fold((0u64, 0u64), |(count, bytes), (k, e)| {
                (count + 1, bytes + (k.len() + e.value.len()) as u64)
            });
        drop(store);

        let uptime = Utc::now().signed_duration_since(self.up_since);

        Ok(CacheStats {
            total_keys,
            memory_bytes: Some(memory_bytes),
            memory_human: Some(format_bytes(memory_bytes)),
            up_since: Some(self.up_since),
            uptime_days: Some(uptime.num_days().max(0) as u64),
            connected_clients: None,
            ..CacheStats::default()
        })
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Format a byte count the way Redis reports `used_memory_human`
#[allow(clippy::cast_precision_loss)]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "K", "M", "G"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.2}{}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::FingerprintBuilder;
    use crate::completion::{FieldName, OperationKind};

    fn key(code: &str) -> CacheKey {
        FingerprintBuilder::new(OperationKind::Explain)
            .field(FieldName::Code, code)
            .build()
            .cache_key("test")
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_basic_set_get() {
        let cache = InMemoryCache::new();
        let k = key("a");

        cache.set(&k, b"test data", HOUR).await.unwrap();
        let result = cache.get(&k).await.unwrap();

        assert_eq!(result, Some(b"test data".to_vec()));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let cache = InMemoryCache::new();
        assert!(cache.get(&key("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = InMemoryCache::new();
        let k = key("a");

        cache.set(&k, b"first", HOUR).await.unwrap();
        cache.set(&k, b"second", HOUR).await.unwrap();

        assert_eq!(cache.get(&k).await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(cache.stats().await.unwrap().total_keys, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_with_paused_clock() {
        let cache = InMemoryCache::new();
        let k = key("a");

        cache.set(&k, b"v", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&k).await.unwrap(), Some(b"v".to_vec()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&k).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_excluded_from_stats() {
        let cache = InMemoryCache::new();
        cache.set(&key("short"), b"v", Duration::from_secs(1)).await.unwrap();
        cache.set(&key("long"), b"v", HOUR).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.stats().await.unwrap().total_keys, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_entries_evicts_soonest_expiring() {
        let cache = InMemoryCache::new().with_max_entries(2);
        let (k1, k2, k3) = (key("1"), key("2"), key("3"));

        cache.set(&k1, b"1", Duration::from_secs(10)).await.unwrap();
        cache.set(&k2, b"2", HOUR).await.unwrap();
        cache.set(&k3, b"3", HOUR).await.unwrap();

        assert!(cache.get(&k1).await.unwrap().is_none());
        assert!(cache.get(&k2).await.unwrap().is_some());
        assert!(cache.get(&k3).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_returns_removed_count() {
        let cache = InMemoryCache::new();
        let (k1, k2) = (key("1"), key("2"));

        cache.set(&k1, b"data1", HOUR).await.unwrap();
        cache.set(&k2, b"data2", HOUR).await.unwrap();

        assert_eq!(cache.clear().await.unwrap(), 2);
        assert!(cache.get(&k1).await.unwrap().is_none());
        assert!(cache.get(&k2).await.unwrap().is_none());
        assert_eq!(cache.stats().await.unwrap().total_keys, 0);
    }

    #[tokio::test]
    async fn test_stats_accuracy() {
        let cache = InMemoryCache::new();
        let k = key("a");

        cache.get(&k).await.unwrap();
        cache.set(&k, b"test", HOUR).await.unwrap();
        cache.get(&k).await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_keys, 1);
        assert!(stats.memory_bytes.unwrap() >= 4);
        assert!(stats.up_since.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_expiry_removal_keeps_fresh_entry() {
        let cache = InMemoryCache::new();
        let k = key("a");

        cache.set(&k, b"stale", Duration::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        let observed_at = Instant::now();

        // A writer refreshes the key after a reader saw it expired but
        // before that reader took the write lock.
        cache.set(&k, b"fresh", HOUR).await.unwrap();
        cache.remove_if_expired(k.as_str(), observed_at);

        assert_eq!(cache.get(&k).await.unwrap(), Some(b"fresh".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_read_removes_entry() {
        let cache = InMemoryCache::new();
        let k = key("a");

        cache.set(&k, b"v", Duration::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(cache.get(&k).await.unwrap().is_none());
        assert!(cache.store.read().is_empty());
    }

    #[tokio::test]
    async fn test_huge_ttl_is_clamped() {
        let cache = InMemoryCache::new();
        let k = key("a");

        cache.set(&k, b"v", Duration::MAX).await.unwrap();
        cache
            .set(&key("b"), b"v", Duration::from_secs(u64::MAX))
            .await
            .unwrap();

        assert_eq!(cache.get(&k).await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.stats().await.unwrap().total_keys, 2);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let cache = InMemoryCache::new();
        let k = key("a");

        let cache_clone = cache.clone();
        cache.set(&k, b"test data", HOUR).await.unwrap();

        assert_eq!(cache_clone.get(&k).await.unwrap(), Some(b"test data".to_vec()));
    }

    #[tokio::test]
    async fn test_value_too_large_rejected() {
        let cache = InMemoryCache::new().with_max_value_size(100);
        let large_value = vec![0u8; 200];

        match cache.set(&key("a"), &large_value, HOUR).await.unwrap_err() {
            CacheError::ValueTooLarge { size, max } => {
                assert_eq!(size, 200);
                assert_eq!(max, 100);
            }
            e => panic!("Expected ValueTooLarge error, got: {e:?}"),
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        assert!(InMemoryCache::new().health_check().await.is_ok());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.00K");
        assert_eq!(format_bytes(1_101_004), "1.05M");
    }

    #[test]
    fn test_debug_impl() {
        let cache = InMemoryCache::new()
            .with_max_entries(100)
            .with_max_value_size(1024);
        let debug_str = format!("{cache:?}");
        assert!(debug_str.contains("InMemoryCache"));
        assert!(debug_str.contains("100"));
        assert!(debug_str.contains("1024"));
    }
}
