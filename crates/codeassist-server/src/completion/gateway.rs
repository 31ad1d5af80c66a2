//! Boundary to the AI completion provider

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::{CompletionPayload, CompletionRequest};

/// Completion provider failures. Never retried by the server.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Request(String),

    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Upstream timeout after {0:?}")]
    Timeout(Duration),

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),
}

impl UpstreamError {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Produces a fresh answer for a request on a cache miss
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionPayload, UpstreamError>;
}
