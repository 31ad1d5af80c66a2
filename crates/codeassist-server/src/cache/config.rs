//! Cache configuration types

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default maximum value size: 1MB
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1_048_576;

/// Default entry lifetime: one hour
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default bound on a single store round-trip
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(250);

/// Longest lifetime an entry can be given; larger TTLs are clamped to it
pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Default bound on admin calls (`clear`, `stats`) that walk the whole namespace
pub const DEFAULT_ADMIN_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_KEY_PREFIX: &str = "codeassist";

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Cache backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    Noop,
    Memory,
    #[default]
    Redis,
}

impl CacheBackend {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Memory => "memory",
            Self::Redis => "redis",
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" | "mem" => Ok(Self::Memory),
            "noop" | "none" | "disabled" => Ok(Self::Noop),
            other => Err(format!("unknown cache backend: {other}")),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,
    pub backend: CacheBackend,
    /// Shared store address (redis backend)
    pub url: String,
    /// TTL applied when a `put` does not override it
    pub default_ttl: Duration,
    /// Namespace for every key this server writes
    pub key_prefix: String,
    /// Bound on a single store call
    pub operation_timeout: Duration,
    /// Bound on `clear` and `stats`
    pub admin_timeout: Duration,
    /// Maximum entries for the in-memory backend
    pub max_entries: Option<usize>,
    /// Maximum size of a single cached value in bytes (default: 1MB)
    pub max_value_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Redis,
            url: DEFAULT_REDIS_URL.to_string(),
            default_ttl: DEFAULT_TTL,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            admin_timeout: DEFAULT_ADMIN_TIMEOUT,
            max_entries: Some(10_000),
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }
}

impl CacheConfig {
    /// In-memory configuration, used by tests and single-instance deployments
    #[must_use]
    pub fn memory() -> Self {
        Self {
            backend: CacheBackend::Memory,
            ..Self::default()
        }
    }

    /// Configuration with caching switched off
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Backend that will actually be used, after the enabled flag
    #[must_use]
    pub const fn effective_backend(&self) -> CacheBackend {
        if self.enabled {
            self.backend
        } else {
            CacheBackend::Noop
        }
    }
}
