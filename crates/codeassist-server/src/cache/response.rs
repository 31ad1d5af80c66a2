//! Typed response cache over a [`CacheProvider`]
//!
//! The cache is an optimization, never a correctness dependency: reads that
//! fail or time out become misses, writes that fail are logged and dropped.
//! Only the admin surface (`clear`, `stats`) reports store errors, under its
//! own longer bound since both walk the whole namespace.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::{CacheConfig, MAX_ENTRY_TTL};
use super::error::{CacheError, CacheResult};
use super::key::Fingerprint;
use super::provider::{CacheProvider, CacheStats, HitCounters};
use crate::completion::CompletionPayload;

/// Stored form of one cached response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub payload: CompletionPayload,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Memoizes completion payloads by fingerprint
#[derive(Clone)]
pub struct ResponseCache {
    provider: Arc<dyn CacheProvider>,
    enabled: bool,
    prefix: String,
    default_ttl: Duration,
    operation_timeout: Duration,
    admin_timeout: Duration,
    counters: Arc<HitCounters>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("backend", &self.provider.backend_name())
            .field("enabled", &self.enabled)
            .field("prefix", &self.prefix)
            .field("default_ttl", &self.default_ttl)
            .field("operation_timeout", &self.operation_timeout)
            .field("admin_timeout", &self.admin_timeout)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    pub fn new(provider: Arc<dyn CacheProvider>, config: &CacheConfig) -> Self {
        Self {
            provider,
            enabled: config.enabled,
            prefix: config.key_prefix.clone(),
            default_ttl: config.default_ttl,
            operation_timeout: config.operation_timeout,
            admin_timeout: config.admin_timeout,
            counters: Arc::new(HitCounters::default()),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    async fn bounded<T>(&self, fut: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
        within(self.operation_timeout, fut).await
    }

    async fn bounded_admin<T>(&self, fut: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
        within(self.admin_timeout, fut).await
    }

    fn record(&self, hit: bool) {
        if hit {
            self.counters.record_hit();
        } else {
            self.counters.record_miss();
        }
        record_lookup(hit);
    }

    /// Look up a live payload for `fingerprint`.
    ///
    /// Store failures, undecodable entries, entries past their expiry and
    /// entries whose shape does not match the fingerprint's operation are
    /// all reported as a miss.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<CompletionPayload> {
        if !self.enabled {
            return None;
        }

        let key = fingerprint.cache_key(&self.prefix);
        let bytes = match self.bounded(self.provider.get(&key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.record(false);
                return None;
            }
            Err(e) => {
                warn!(error = %e, unavailable = e.is_unavailable(), "Cache read failed, treating as miss");
                self.record(false);
                return None;
            }
        };

        let entry = match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(cache.key = %key, error = %e, "Discarding undecodable cache entry");
                self.record(false);
                return None;
            }
        };

        if entry.expires_at <= Utc::now() {
            debug!(cache.key = %key, "Cache entry past expiry");
            self.record(false);
            return None;
        }

        if !entry.payload.matches(fingerprint.kind()) {
            warn!(
                cache.key = %key,
                expected = %fingerprint.kind(),
                found = %entry.payload.kind(),
                "Cached payload shape does not match operation"
            );
            self.record(false);
            return None;
        }

        self.record(true);
        Some(entry.payload)
    }

    /// Store `payload` under `fingerprint`, overwriting any previous entry.
    ///
    /// `ttl` defaults to the configured duration and is capped at
    /// [`MAX_ENTRY_TTL`]. Failures are logged only.
    pub async fn put(
        &self,
        fingerprint: &Fingerprint,
        payload: &CompletionPayload,
        ttl: Option<Duration>,
    ) {
        if !self.enabled {
            return;
        }

        let ttl = ttl.unwrap_or(self.default_ttl).min(MAX_ENTRY_TTL);
        let key = fingerprint.cache_key(&self.prefix);
        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let entry = CacheEntry {
            fingerprint: fingerprint.to_hex(),
            payload: payload.clone(),
            created_at,
            expires_at,
        };

        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.bounded(self.provider.set(&key, &bytes, ttl)).await {
            warn!(error = %e, unavailable = e.is_unavailable(), "Cache write failed");
        }
    }

    /// Remove every entry this server owns
    pub async fn clear(&self) -> CacheResult<u64> {
        if !self.enabled {
            return Ok(0);
        }
        self.bounded_admin(self.provider.clear()).await
    }

    /// Snapshot of the underlying store, `None` when caching is disabled.
    ///
    /// Hit and miss counts are the lookups this process actually served.
    pub async fn stats(&self) -> Option<CacheResult<CacheStats>> {
        if !self.enabled {
            return None;
        }
        let stats = self.bounded_admin(self.provider.stats()).await;
        Some(stats.map(|stats| CacheStats {
            hit_count: self.counters.hits(),
            miss_count: self.counters.misses(),
            ..stats
        }))
    }

    /// Ping the store; a disabled cache is always healthy
    pub async fn health_check(&self) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }
        self.bounded_admin(self.provider.health_check()).await
    }
}

async fn within<T>(limit: Duration, fut: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| CacheError::Timeout)?
}

#[cfg(feature = "metrics")]
fn record_lookup(hit: bool) {
    if hit {
        crate::observability::record_cache_hit();
    } else {
        crate::observability::record_cache_miss();
    }
}

#[cfg(not(feature = "metrics"))]
const fn record_lookup(_hit: bool) {}
