//! Prometheus metrics for codeassist-server

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::Result;
use crate::error::Error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static START_TIME: OnceLock<Instant> = OnceLock::new();

// Server metrics
const METRIC_UPTIME: &str = "codeassist_uptime_seconds";
const METRIC_INFO: &str = "codeassist_info";
const METRIC_REQUESTS: &str = "codeassist_requests_total";

// Gateway metrics
const METRIC_GATEWAY_DURATION: &str = "codeassist_gateway_duration_seconds";
const METRIC_GATEWAY_ERRORS: &str = "codeassist_gateway_errors_total";

// Cache metrics
const METRIC_CACHE_HITS: &str = "codeassist_cache_hits_total";
const METRIC_CACHE_MISSES: &str = "codeassist_cache_misses_total";
const METRIC_CACHE_CLEARED: &str = "codeassist_cache_cleared_keys_total";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();
    START_TIME.set(Instant::now()).ok();

    register_metrics();
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

fn register_metrics() {
    describe_gauge!(METRIC_UPTIME, "Server uptime in seconds");
    describe_gauge!(METRIC_INFO, "Server information (always 1)");
    describe_counter!(METRIC_REQUESTS, "Total HTTP requests by method and status");

    describe_histogram!(
        METRIC_GATEWAY_DURATION,
        "Completion gateway call duration in seconds"
    );
    describe_counter!(METRIC_GATEWAY_ERRORS, "Total completion gateway failures");

    describe_counter!(METRIC_CACHE_HITS, "Total response cache hits");
    describe_counter!(METRIC_CACHE_MISSES, "Total response cache misses");
    describe_counter!(METRIC_CACHE_CLEARED, "Total keys removed by cache clears");

    gauge!(
        METRIC_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
    )
    .set(1.0);
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    if let Some(start) = START_TIME.get() {
        gauge!(METRIC_UPTIME).set(start.elapsed().as_secs_f64());
    }

    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record a finished HTTP request.
pub fn record_request(method: &str, status: u16) {
    counter!(
        METRIC_REQUESTS,
        "method" => method.to_owned(),
        "status" => status.to_string(),
    )
    .increment(1);
}

/// Record a completion gateway call.
pub fn record_gateway_call(operation: &str, duration: Duration, success: bool) {
    histogram!(
        METRIC_GATEWAY_DURATION,
        "operation" => operation.to_owned(),
        "status" => if success { "success" } else { "error" },
    )
    .record(duration.as_secs_f64());

    if !success {
        counter!(METRIC_GATEWAY_ERRORS, "operation" => operation.to_owned()).increment(1);
    }
}

/// Record a cache hit.
pub fn record_cache_hit() {
    counter!(METRIC_CACHE_HITS).increment(1);
}

/// Record a cache miss.
pub fn record_cache_miss() {
    counter!(METRIC_CACHE_MISSES).increment(1);
}

/// Record keys removed by an admin clear.
pub fn record_cache_cleared(removed: u64) {
    counter!(METRIC_CACHE_CLEARED).increment(removed);
}
