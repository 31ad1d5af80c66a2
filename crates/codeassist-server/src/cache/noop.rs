//! No-op cache implementation

use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{CacheProvider, CacheStats};

/// Cache that never stores anything
///
/// Selected when caching is disabled; every read is a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheProvider for NoopCache {
    async fn get(&self, _key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _key: &CacheKey, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn clear(&self) -> CacheResult<u64> {
        Ok(0)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        Ok(CacheStats::default())
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "noop"
    }
}
