//! Shared-store cache backed by Redis
//!
//! Every key this server writes lives under `{prefix}:`. Admin operations
//! (clear, key counting) walk that namespace with `SCAN` in fixed-size
//! batches and never touch foreign keys.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::{Config as PoolSettings, Connection, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;

use super::config::{CacheConfig, MAX_ENTRY_TTL};
use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::provider::{CacheProvider, CacheStats};
use crate::constants::SCAN_BATCH_SIZE;

const DEFAULT_POOL_SIZE: usize = 16;

/// Redis-backed [`CacheProvider`]
///
/// The pool connects lazily, so constructing a `RedisCache` succeeds even
/// when the store is down; operations then fail with
/// [`CacheError::Unavailable`].
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    prefix: String,
    max_value_size: usize,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisCache")
            .field("prefix", &self.prefix)
            .field("pool_size", &status.size)
            .field("pool_available", &status.available)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Build a pool for `config.url`
    pub fn connect(config: &CacheConfig) -> CacheResult<Self> {
        let mut settings = PoolSettings::from_url(&config.url);
        let mut pool_config = PoolConfig::new(DEFAULT_POOL_SIZE);
        pool_config.timeouts.wait = Some(config.operation_timeout);
        pool_config.timeouts.create = Some(config.operation_timeout);
        pool_config.timeouts.recycle = Some(config.operation_timeout);
        settings.pool = Some(pool_config);

        let pool = settings
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Other(format!("invalid redis configuration: {e}")))?;

        Ok(Self::from_pool(pool, &config.key_prefix, config.max_value_size))
    }

    #[must_use]
    pub fn from_pool(pool: Pool, prefix: &str, max_value_size: usize) -> Self {
        Self {
            pool,
            prefix: prefix.to_string(),
            max_value_size,
        }
    }

    async fn connection(&self) -> CacheResult<Connection> {
        Ok(self.pool.get().await?)
    }

    fn check_namespace(&self, key: &CacheKey) {
        debug_assert!(
            key.has_prefix(&self.prefix),
            "key {key} outside namespace {}",
            self.prefix
        );
    }

    fn pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }

    /// One SCAN round over the prefix namespace
    async fn scan_batch(
        &self,
        conn: &mut Connection,
        cursor: u64,
    ) -> CacheResult<(u64, Vec<String>)> {
        let batch: (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(self.pattern())
            .arg("COUNT")
            .arg(SCAN_BATCH_SIZE)
            .query_async(conn)
            .await?;
        Ok(batch)
    }

    async fn count_keys(&self, conn: &mut Connection) -> CacheResult<u64> {
        let mut total = 0;
        let mut cursor = 0;
        loop {
            let (next, keys) = self.scan_batch(conn, cursor).await?;
            total += keys.len() as u64;
            if next == 0 {
                return Ok(total);
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl CacheProvider for RedisCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        self.check_namespace(key);
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(key.as_str()).await?;
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> CacheResult<()> {
        if value.len() > self.max_value_size {
            return Err(CacheError::ValueTooLarge {
                size: value.len(),
                max: self.max_value_size,
            });
        }

        self.check_namespace(key);
        let mut conn = self.connection().await?;
        // SETEX rejects 0; sub-second TTLs round up
        let seconds = ttl.min(MAX_ENTRY_TTL).as_secs().max(1);
        let () = conn.set_ex(key.as_str(), value, seconds).await?;
        Ok(())
    }

    async fn clear(&self) -> CacheResult<u64> {
        let mut conn = self.connection().await?;
        let mut removed = 0;
        let mut cursor = 0;
        loop {
            let (next, keys) = self.scan_batch(&mut conn, cursor).await?;
            if !keys.is_empty() {
                let deleted: u64 = conn.del(keys).await?;
                removed += deleted;
            }
            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let mut conn = self.connection().await?;

        let info: String = redis::cmd("INFO").query_async(&mut conn).await?;
        let info = parse_info(&info);

        let total_keys = self.count_keys(&mut conn).await?;

        let number = |name: &str| info.get(name).and_then(|v| v.parse::<u64>().ok());
        let up_since = number("uptime_in_seconds")
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| Utc::now() - chrono::Duration::seconds(secs));

        Ok(CacheStats {
            total_keys,
            memory_bytes: number("used_memory"),
            memory_human: info.get("used_memory_human").cloned(),
            up_since,
            uptime_days: number("uptime_in_days"),
            connected_clients: number("connected_clients"),
            ..CacheStats::default()
        })
    }

    async fn health_check(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Parse the `field:value` lines of an `INFO` reply
fn parse_info(info: &str) -> HashMap<String, String> {
    info.lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::FingerprintBuilder;
    use crate::completion::{FieldName, OperationKind};

    const INFO_SAMPLE: &str = "# Server\r\n\
        redis_version:7.2.4\r\n\
        uptime_in_seconds:172800\r\n\
        uptime_in_days:2\r\n\
        \r\n\
        # Clients\r\n\
        connected_clients:3\r\n\
        \r\n\
        # Memory\r\n\
        used_memory:1101004\r\n\
        used_memory_human:1.05M\r\n";

    #[test]
    fn test_parse_info_fields() {
        let info = parse_info(INFO_SAMPLE);
        assert_eq!(info.get("uptime_in_days").map(String::as_str), Some("2"));
        assert_eq!(info.get("connected_clients").map(String::as_str), Some("3"));
        assert_eq!(info.get("used_memory_human").map(String::as_str), Some("1.05M"));
        assert!(!info.contains_key("# Server"));
    }

    #[test]
    fn test_parse_info_ignores_garbage() {
        let info = parse_info("no separators here\n\n");
        assert!(info.is_empty());
    }

    fn test_key() -> CacheKey {
        FingerprintBuilder::new(OperationKind::Explain)
            .field(FieldName::Code, "x = 1")
            .build()
            .cache_key("codeassist")
    }

    fn unreachable_config() -> CacheConfig {
        CacheConfig {
            url: "redis://127.0.0.1:1".to_string(),
            operation_timeout: Duration::from_millis(200),
            ..CacheConfig::default()
        }
    }

    #[tokio::test]
    async fn test_connect_is_lazy() {
        let cache = RedisCache::connect(&unreachable_config()).unwrap();
        assert_eq!(cache.backend_name(), "redis");
        assert!(format!("{cache:?}").contains("codeassist"));
    }

    #[tokio::test]
    async fn test_unreachable_store_reports_unavailable() {
        let cache = RedisCache::connect(&unreachable_config()).unwrap();
        let key = test_key();

        let err = cache.get(&key).await.unwrap_err();
        assert!(err.is_unavailable(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside namespace")]
    async fn test_foreign_key_rejected_before_store_call() {
        let cache = RedisCache::connect(&unreachable_config()).unwrap();
        let foreign = FingerprintBuilder::new(OperationKind::Explain)
            .field(FieldName::Code, "x = 1")
            .build()
            .cache_key("codeassist-other");

        let _ = cache.set(&foreign, b"v", Duration::from_secs(60)).await;
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let config = CacheConfig {
            url: "not a url".to_string(),
            ..CacheConfig::default()
        };
        assert!(RedisCache::connect(&config).is_err());
    }

    #[tokio::test]
    async fn test_value_too_large_checked_before_connecting() {
        let mut config = unreachable_config();
        config.max_value_size = 4;
        let cache = RedisCache::connect(&config).unwrap();
        let key = test_key();

        let err = cache
            .set(&key, b"too large", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::ValueTooLarge { .. }));
    }
}
