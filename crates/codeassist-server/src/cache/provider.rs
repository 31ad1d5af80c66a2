//! Cache provider trait definition

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::CacheResult;
use super::key::CacheKey;

/// Point-in-time snapshot of a cache backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Live keys owned by this server (under its prefix)
    pub total_keys: u64,
    /// Approximate memory use in bytes, when the backend can tell
    pub memory_bytes: Option<u64>,
    /// Backend-formatted memory figure (e.g. `1.05M`)
    pub memory_human: Option<String>,
    /// Lookups served as hits; providers leave this at zero and
    /// [`ResponseCache`](super::ResponseCache) fills it in
    pub hit_count: u64,
    pub miss_count: u64,
    pub up_since: Option<DateTime<Utc>>,
    pub uptime_days: Option<u64>,
    pub connected_clients: Option<u64>,
}

/// Hit/miss counters local to this process
#[derive(Debug, Default)]
pub struct HitCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HitCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Async key/value store with TTL semantics
///
/// Implementors must treat an entry past its expiry as absent on every read,
/// whether or not it has been physically removed.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Get a live value by key
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>>;

    /// Store a value, overwriting any previous entry
    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Remove every entry owned by this server, returning how many were removed
    async fn clear(&self) -> CacheResult<u64>;

    /// Snapshot of the backend's state
    async fn stats(&self) -> CacheResult<CacheStats>;

    /// Health check for the cache backend
    async fn health_check(&self) -> CacheResult<()>;

    /// Short backend label for logs
    fn backend_name(&self) -> &'static str;
}
