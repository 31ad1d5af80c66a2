//! Per-request tracing middleware
//!
//! Every inbound call gets a [`RequestContext`] and a [`TraceSpan`] guard.
//! The guard emits exactly one [`TraceRecord`]: `request_completed` when the
//! handler chain produced a response, or `request_aborted` (status 499) when
//! the request future was dropped first, e.g. on client disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::constants::{HEADER_PROCESS_TIME, HEADER_REQUEST_ID};

/// Target used by [`LogSink`] for access records
pub const ACCESS_LOG_TARGET: &str = "codeassist::access";

/// Status recorded when the client went away before a response existed
pub const STATUS_CLIENT_CLOSED: u16 = 499;

/// Identity and timing of one inbound call
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    method: String,
    path: String,
    started_at: Instant,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method: method.to_string(),
            path: path.to_string(),
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Terminal event of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEvent {
    RequestCompleted,
    RequestAborted,
}

impl TraceEvent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RequestCompleted => "request_completed",
            Self::RequestAborted => "request_aborted",
        }
    }
}

/// Structured access record, one per request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub event: TraceEvent,
    pub request_id: String,
    pub path: String,
    pub method: String,
    pub status_code: u16,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
#[error("trace sink failed: {0}")]
pub struct TraceSinkError(pub String);

/// Destination for access records. Failures never affect the response.
pub trait TraceSink: Send + Sync {
    fn emit(&self, record: &TraceRecord) -> Result<(), TraceSinkError>;
}

/// Writes access records as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn emit(&self, record: &TraceRecord) -> Result<(), TraceSinkError> {
        tracing::info!(
            target: ACCESS_LOG_TARGET,
            event = record.event.as_str(),
            request_id = %record.request_id,
            path = %record.path,
            method = %record.method,
            status_code = record.status_code,
            duration_ms = record.duration_ms,
            timestamp = %record.timestamp.to_rfc3339(),
            "{}",
            record.event.as_str()
        );
        Ok(())
    }
}

/// Keeps access records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TraceRecord>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }
}

impl TraceSink for MemorySink {
    fn emit(&self, record: &TraceRecord) -> Result<(), TraceSinkError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Finalizes a request exactly once.
///
/// [`TraceSpan::finish`] records completion; dropping an unfinished span
/// records an abort.
pub struct TraceSpan {
    context: RequestContext,
    sink: Arc<dyn TraceSink>,
    finished: bool,
}

impl TraceSpan {
    #[must_use]
    pub fn start(context: RequestContext, sink: Arc<dyn TraceSink>) -> Self {
        Self {
            context,
            sink,
            finished: false,
        }
    }

    #[must_use]
    pub const fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Record completion and return the emitted record
    pub fn finish(mut self, status: StatusCode) -> TraceRecord {
        self.finished = true;
        self.emit(TraceEvent::RequestCompleted, status.as_u16())
    }

    fn emit(&self, event: TraceEvent, status_code: u16) -> TraceRecord {
        let record = TraceRecord {
            event,
            request_id: self.context.request_id.clone(),
            path: self.context.path.clone(),
            method: self.context.method.clone(),
            status_code,
            duration_ms: self.context.elapsed().as_secs_f64() * 1000.0,
            timestamp: Utc::now(),
        };

        if let Err(e) = self.sink.emit(&record) {
            tracing::debug!(error = %e, "Dropped access record");
        }

        #[cfg(feature = "metrics")]
        crate::observability::record_request(&record.method, record.status_code);

        record
    }
}

impl Drop for TraceSpan {
    fn drop(&mut self) {
        if !self.finished {
            self.emit(TraceEvent::RequestAborted, STATUS_CLIENT_CLOSED);
        }
    }
}

/// Middleware state carrying the access record sink
#[derive(Clone)]
pub struct RequestTracer {
    sink: Arc<dyn TraceSink>,
}

impl std::fmt::Debug for RequestTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTracer").finish_non_exhaustive()
    }
}

impl Default for RequestTracer {
    fn default() -> Self {
        Self::new(Arc::new(LogSink))
    }
}

impl RequestTracer {
    #[must_use]
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self { sink }
    }
}

/// Assign a request id, time the call and emit its access record.
///
/// Adds `X-Request-Id` and `X-Process-Time` (milliseconds) to every response.
pub async fn trace_requests(
    State(tracer): State<RequestTracer>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = RequestContext::new(request.method().as_str(), request.uri().path());
    request.extensions_mut().insert(context.clone());

    let span = tracing::info_span!(
        "request",
        otel.name = %format!("{} {}", context.method(), context.path()),
        request_id = %context.request_id(),
    );
    let guard = TraceSpan::start(context, Arc::clone(&tracer.sink));

    let mut response = next.run(request).instrument(span).await;
    let record = guard.finish(response.status());

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&record.request_id) {
        headers.insert(HEADER_REQUEST_ID, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{:.3}", record.duration_ms)) {
        headers.insert(HEADER_PROCESS_TIME, value);
    }

    response
}
