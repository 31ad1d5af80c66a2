//! Constants for the code assistance server

/// Service name reported by the root and health endpoints
pub const SERVICE_NAME: &str = "codeassist-server";

/// Crate version reported by the root and health endpoints
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix for all API routes
pub const API_PREFIX: &str = "/api/v1";

/// Health status: healthy
pub const STATUS_HEALTHY: &str = "healthy";

/// Default `language` for every operation
pub const DEFAULT_LANGUAGE: &str = "python";

/// Default documentation `style`
pub const DEFAULT_DOC_STYLE: &str = "google";

/// Token type returned from login
pub const TOKEN_TYPE_BEARER: &str = "bearer";

/// Response header carrying the request correlation id
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Response header carrying elapsed milliseconds
pub const HEADER_PROCESS_TIME: &str = "x-process-time";

/// Maximum bytes accepted for `code`
pub const MAX_CODE_LENGTH: usize = 100_000;

/// Maximum bytes accepted for `prompt`, `context` and `instructions`
pub const MAX_TEXT_LENGTH: usize = 10_000;

/// Maximum bytes accepted for `language` and `style`
pub const MAX_LABEL_LENGTH: usize = 64;

/// Minimum length of the token signing secret in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Keys deleted/counted per SCAN round on the shared store
pub const SCAN_BATCH_SIZE: usize = 100;
