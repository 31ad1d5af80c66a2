//! Traced cache wrapper for observability

use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{CacheProvider, CacheStats};

/// Wrapper that adds tracing to any `CacheProvider`
///
/// Spans are debug-level; keys are digests and carry no request content.
pub struct TracedCache<C> {
    inner: C,
    service_name: String,
}

impl<C: std::fmt::Debug> std::fmt::Debug for TracedCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedCache")
            .field("inner", &self.inner)
            .field("service_name", &self.service_name)
            .finish()
    }
}

impl<C: Clone> Clone for TracedCache<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            service_name: self.service_name.clone(),
        }
    }
}

impl<C> TracedCache<C> {
    pub fn new(cache: C, service_name: impl Into<String>) -> Self {
        Self {
            inner: cache,
            service_name: service_name.into(),
        }
    }
}

#[async_trait]
impl<C: CacheProvider> CacheProvider for TracedCache<C> {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        let span = tracing::debug_span!(
            "cache.get",
            cache.key = %key,
            cache.backend = self.inner.backend_name(),
            service.name = %self.service_name,
            otel.name = "cache.get",
        );

        let result = self.inner.get(key).instrument(span).await;

        match &result {
            Ok(Some(data)) => {
                tracing::debug!(
                    cache.result = "hit",
                    cache.key = %key,
                    cache.size_bytes = data.len(),
                );
            }
            Ok(None) => {
                tracing::debug!(cache.result = "miss", cache.key = %key);
            }
            Err(e) => {
                tracing::warn!(cache.result = "error", cache.key = %key, error = %e);
            }
        }

        result
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let span = tracing::debug_span!(
            "cache.set",
            cache.key = %key,
            cache.backend = self.inner.backend_name(),
            cache.value_size = value.len(),
            cache.ttl_secs = ttl.as_secs(),
            otel.name = "cache.set",
        );

        let result = self.inner.set(key, value, ttl).instrument(span).await;

        if let Err(ref e) = result {
            tracing::warn!(cache.operation = "set", cache.key = %key, error = %e);
        }

        result
    }

    async fn clear(&self) -> CacheResult<u64> {
        let span = tracing::debug_span!(
            "cache.clear",
            cache.backend = self.inner.backend_name(),
            otel.name = "cache.clear",
        );

        let result = self.inner.clear().instrument(span).await;

        match &result {
            Ok(count) => tracing::info!(cache.operation = "clear", cache.removed = count),
            Err(e) => tracing::warn!(cache.operation = "clear", error = %e),
        }

        result
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let span = tracing::debug_span!("cache.stats", otel.name = "cache.stats");

        let result = self.inner.stats().instrument(span).await;

        if let Err(ref e) = result {
            tracing::warn!(cache.operation = "stats", error = %e);
        }

        result
    }

    async fn health_check(&self) -> CacheResult<()> {
        let span = tracing::debug_span!("cache.health_check", otel.name = "cache.health_check");

        self.inner.health_check().instrument(span).await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::super::memory::InMemoryCache;
    use super::super::noop::NoopCache;
    use super::*;
    use crate::cache::key::FingerprintBuilder;
    use crate::completion::{FieldName, OperationKind};

    fn key() -> CacheKey {
        FingerprintBuilder::new(OperationKind::Explain)
            .field(FieldName::Code, "x = 1")
            .build()
            .cache_key("test")
    }

    #[tokio::test]
    async fn test_traced_cache_get_miss() {
        let traced = TracedCache::new(NoopCache::new(), "test-service");
        assert!(traced.get(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_traced_cache_round_trip() {
        let traced = TracedCache::new(InMemoryCache::new(), "test-service");
        let k = key();

        traced.set(&k, b"payload", Duration::from_secs(60)).await.unwrap();
        assert_eq!(traced.get(&k).await.unwrap(), Some(b"payload".to_vec()));
        assert_eq!(traced.clear().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_traced_cache_stats_passthrough() {
        let traced = TracedCache::new(InMemoryCache::new(), "test-service");
        traced.set(&key(), b"v", Duration::from_secs(60)).await.unwrap();

        let stats = traced.stats().await.unwrap();
        assert_eq!(stats.total_keys, 1);
    }

    #[tokio::test]
    async fn test_traced_cache_health_check() {
        let traced = TracedCache::new(NoopCache::new(), "test-service");
        assert!(traced.health_check().await.is_ok());
    }

    #[test]
    fn test_traced_cache_backend_name() {
        let traced = TracedCache::new(InMemoryCache::new(), "test-service");
        assert_eq!(traced.backend_name(), "memory");
    }

    #[test]
    fn test_traced_cache_debug() {
        let traced = TracedCache::new(NoopCache::new(), "test-service");
        let debug_str = format!("{traced:?}");
        assert!(debug_str.contains("TracedCache"));
        assert!(debug_str.contains("test-service"));
    }
}
