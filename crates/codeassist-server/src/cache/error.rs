//! Cache error types

use thiserror::Error;

/// Cache operation errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// The shared store could not be reached
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Cache operation timeout")]
    Timeout,

    #[error("Value too large: {size} bytes (max: {max} bytes)")]
    ValueTooLarge { size: usize, max: usize },

    #[error("Cache error: {0}")]
    Other(String),
}

impl CacheError {
    /// Whether the error means the store itself could not serve the call.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
