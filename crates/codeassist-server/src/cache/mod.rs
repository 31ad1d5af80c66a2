//! Response caching layer
//!
//! Completion payloads are memoized by a [`Fingerprint`] of the operation and
//! its normalized inputs. Storage is pluggable behind [`CacheProvider`].
//!
//! # Available Backends
//!
//! - [`RedisCache`] - shared store reachable by every server instance
//! - [`InMemoryCache`] - per-process store with TTL support (single instance, tests)
//! - [`NoopCache`] - caching disabled
//!
//! # Observability
//!
//! [`create_cache`] wraps every backend in [`TracedCache`], which adds debug
//! spans and warns on store errors.
//!
//! # Failure Model
//!
//! [`ResponseCache`] bounds each store call by
//! [`CacheConfig::operation_timeout`]. A slow or unreachable store makes
//! lookups miss; it never fails the request being served. `clear` and `stats`
//! get the longer [`CacheConfig::admin_timeout`] and report the error.

mod config;
mod error;
mod key;
mod memory;
mod noop;
mod provider;
mod redis_store;
mod response;
mod traced;

use std::sync::Arc;

pub use config::{
    CacheBackend, CacheConfig, DEFAULT_ADMIN_TIMEOUT, DEFAULT_KEY_PREFIX, DEFAULT_MAX_VALUE_SIZE,
    DEFAULT_OPERATION_TIMEOUT, DEFAULT_REDIS_URL, DEFAULT_TTL, MAX_ENTRY_TTL,
};
pub use error::{CacheError, CacheResult};
pub use key::{CacheKey, Fingerprint, FingerprintBuilder};
pub use memory::InMemoryCache;
pub use noop::NoopCache;
pub use provider::{CacheProvider, CacheStats, HitCounters};
pub use redis_store::RedisCache;
pub use response::{CacheEntry, ResponseCache};
pub use traced::TracedCache;

use crate::constants::SERVICE_NAME;

/// Create a cache provider based on configuration
pub fn create_cache(config: &CacheConfig) -> CacheResult<Arc<dyn CacheProvider>> {
    let provider: Arc<dyn CacheProvider> = match config.effective_backend() {
        CacheBackend::Noop => Arc::new(NoopCache::new()),
        CacheBackend::Memory => {
            let mut cache = InMemoryCache::new().with_max_value_size(config.max_value_size);
            if let Some(max) = config.max_entries {
                cache = cache.with_max_entries(max);
            }
            Arc::new(TracedCache::new(cache, SERVICE_NAME))
        }
        CacheBackend::Redis => {
            let cache = RedisCache::connect(config)?;
            Arc::new(TracedCache::new(cache, SERVICE_NAME))
        }
    };

    tracing::info!(
        backend = provider.backend_name(),
        enabled = config.enabled,
        ttl_secs = config.default_ttl.as_secs(),
        "Response cache configured"
    );

    Ok(provider)
}

impl ResponseCache {
    /// Build the configured backend and wrap it
    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        Ok(Self::new(create_cache(config)?, config))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::completion::{FieldName, OperationKind};

    fn key() -> CacheKey {
        FingerprintBuilder::new(OperationKind::Generate)
            .field(FieldName::Prompt, "hello")
            .build()
            .cache_key("test")
    }

    #[test]
    fn test_create_cache_disabled_is_noop() {
        let cache = create_cache(&CacheConfig::disabled()).unwrap();
        assert_eq!(cache.backend_name(), "noop");
    }

    #[test]
    fn test_create_cache_memory() {
        let cache = create_cache(&CacheConfig::memory()).unwrap();
        assert_eq!(cache.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_create_cache_redis_is_lazy() {
        let config = CacheConfig {
            url: "redis://127.0.0.1:1".to_string(),
            ..CacheConfig::default()
        };
        let cache = create_cache(&config).unwrap();
        assert_eq!(cache.backend_name(), "redis");
    }

    #[tokio::test]
    async fn test_create_cache_memory_functional() {
        let config = CacheConfig {
            max_entries: Some(100),
            ..CacheConfig::memory()
        };
        let cache = create_cache(&config).unwrap();
        let k = key();

        cache.set(&k, b"test data", Duration::from_secs(60)).await.unwrap();
        assert!(cache.get(&k).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_cache_memory_with_custom_max_value_size() {
        let config = CacheConfig {
            max_value_size: 100,
            ..CacheConfig::memory()
        };
        let cache = create_cache(&config).unwrap();
        let k = key();

        cache.set(&k, &[0u8; 50], Duration::from_secs(60)).await.unwrap();
        assert!(cache.get(&k).await.unwrap().is_some());

        let result = cache.set(&k, &[0u8; 200], Duration::from_secs(60)).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_response_cache_from_config() {
        let cache = ResponseCache::from_config(&CacheConfig::memory()).unwrap();
        assert!(cache.is_enabled());
        assert_eq!(cache.default_ttl(), DEFAULT_TTL);
    }
}
