//! Cache-first execution of assistant operations

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::cache::{Fingerprint, ResponseCache};
use crate::completion::{
    CompletionFields, CompletionGateway, CompletionPayload, CompletionRequest, OperationKind,
    UpstreamError,
};
use crate::error::{Error, Result};

/// Outcome of one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub payload: CompletionPayload,
    /// Served from the response cache
    pub cached: bool,
}

/// Serves operations from the response cache, falling back to the gateway
#[derive(Clone)]
pub struct CodeAssistant {
    cache: ResponseCache,
    gateway: Arc<dyn CompletionGateway>,
}

impl std::fmt::Debug for CodeAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeAssistant")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl CodeAssistant {
    pub fn new(cache: ResponseCache, gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { cache, gateway }
    }

    #[must_use]
    pub const fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Validate raw fields for `kind` and run the operation
    pub async fn execute(
        &self,
        kind: OperationKind,
        fields: CompletionFields,
    ) -> Result<(CompletionRequest, Completion)> {
        let request = CompletionRequest::new(kind, fields)?;
        let completion = self.run(&request).await?;
        Ok((request, completion))
    }

    /// Run a validated request.
    ///
    /// Upstream failures are never cached. Concurrent misses for the same
    /// fingerprint each reach the gateway; the last write wins.
    #[instrument(skip_all, fields(operation = %request.kind()))]
    pub async fn run(&self, request: &CompletionRequest) -> Result<Completion> {
        let kind = request.kind();
        let fingerprint = Fingerprint::of(request);

        if let Some(payload) = self.cache.get(&fingerprint).await {
            info!(fingerprint = %fingerprint.to_hex(), "Serving cached response");
            return Ok(Completion {
                payload,
                cached: true,
            });
        }
        debug!(fingerprint = %fingerprint.to_hex(), "Cache miss, calling gateway");

        let started = Instant::now();
        let outcome = self.gateway.complete(request).await.and_then(|payload| {
            if payload.matches(kind) {
                Ok(payload)
            } else {
                Err(UpstreamError::MalformedResponse(format!(
                    "expected {kind} payload, got {}",
                    payload.kind()
                )))
            }
        });
        record_gateway_call(kind, started, outcome.is_ok());

        let payload = outcome.map_err(|e| {
            warn!(error = %e, timeout = e.is_timeout(), "Completion gateway failed");
            Error::upstream(kind, e)
        })?;

        self.cache.put(&fingerprint, &payload, None).await;

        Ok(Completion {
            payload,
            cached: false,
        })
    }
}

#[cfg(feature = "metrics")]
fn record_gateway_call(kind: OperationKind, started: Instant, success: bool) {
    crate::observability::record_gateway_call(kind.as_str(), started.elapsed(), success);
}

#[cfg(not(feature = "metrics"))]
const fn record_gateway_call(_kind: OperationKind, _started: Instant, _success: bool) {}
