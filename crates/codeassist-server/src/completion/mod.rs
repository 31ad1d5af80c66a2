//! Completion operations
//!
//! Types describing the five assistant operations, the payloads they produce
//! and the gateway that produces them on a cache miss.
//!
//! - [`OperationKind`] and [`CompletionRequest`] - validated, normalized inputs
//! - [`CompletionPayload`] - tagged result union stored in the cache
//! - [`CompletionGateway`] - provider boundary, implemented by [`OpenAiGateway`]

mod gateway;
mod openai;
mod payload;
pub mod prompt;
mod request;

pub use gateway::{CompletionGateway, UpstreamError};
pub use openai::{
    DEFAULT_BASE_URL, DEFAULT_GATEWAY_TIMEOUT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE, GatewayConfig, OpenAiGateway,
};
pub use payload::{Bug, CompletionPayload, Severity};
pub use request::{
    CompletionFields, CompletionRequest, FieldName, NormalizedFields, OperationKind,
};
