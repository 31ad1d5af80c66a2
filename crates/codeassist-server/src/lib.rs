//! Caching HTTP gateway for AI code assistance
//!
//! Five operations (generate, explain, detect-bugs, refactor, document) are
//! answered by an upstream completion provider and memoized in a shared
//! response cache. Cache administration sits behind bearer-token auth, and
//! every request leaves exactly one access record.

pub mod assistant;
pub mod auth;
pub mod cache;
pub mod completion;
pub mod config;
pub mod constants;
mod error;
pub mod observability;
pub mod transport;
pub mod types;
mod validation;

pub use assistant::{CodeAssistant, Completion};
pub use auth::{AuthConfig, AuthError, AuthGate, AuthenticatedUser, hash_secret};
pub use cache::{
    CacheBackend, CacheConfig, CacheError, CacheKey, CacheProvider, CacheResult, CacheStats,
    Fingerprint, FingerprintBuilder, InMemoryCache, NoopCache, RedisCache, ResponseCache,
    TracedCache, create_cache,
};
pub use completion::{
    CompletionFields, CompletionGateway, CompletionPayload, CompletionRequest, GatewayConfig,
    OpenAiGateway, OperationKind, UpstreamError,
};
pub use config::{Config, ConfigBuilder, LogFormat, ServerConfig, TelemetryConfig};
pub use error::{Error, Result};
pub use transport::{AppState, build_router, run_http};
pub use types::*;
pub use validation::ValidationError;
