//! Observability module for tracing, metrics, and logging

#[cfg(feature = "metrics")]
mod metrics;
mod request_trace;
#[cfg(feature = "telemetry")]
mod telemetry;

#[cfg(feature = "metrics")]
pub use metrics::{
    init_metrics, record_cache_cleared, record_cache_hit, record_cache_miss, record_gateway_call,
    record_request, render_metrics,
};
pub use request_trace::{
    ACCESS_LOG_TARGET, LogSink, MemorySink, RequestContext, RequestTracer, STATUS_CLIENT_CLOSED,
    TraceEvent, TraceRecord, TraceSink, TraceSinkError, TraceSpan, trace_requests,
};
#[cfg(feature = "telemetry")]
pub use telemetry::init_telemetry;
use tracing_subscriber::Layer;
use tracing_subscriber::registry::LookupSpan;

use crate::Result;
use crate::config::{LogFormat, TelemetryConfig};

/// Initialize observability stack
pub fn init_observability(config: &TelemetryConfig) -> Result<()> {
    #[cfg(feature = "metrics")]
    {
        init_metrics()?;
    }

    #[cfg(feature = "telemetry")]
    {
        init_telemetry(config)?;
    }

    #[cfg(not(feature = "telemetry"))]
    {
        init_basic_logging(config);
    }

    Ok(())
}

/// `fmt` layer in the configured output format
fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    }
}

/// Initialize basic logging without OpenTelemetry
#[cfg(not(feature = "telemetry"))]
fn init_basic_logging(config: &TelemetryConfig) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(config.log_format))
        .init();
}

/// Shutdown observability stack
#[allow(clippy::missing_const_for_fn)]
pub fn shutdown_observability() {
    #[cfg(feature = "telemetry")]
    {
        telemetry::shutdown_telemetry();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert!(config.otlp_endpoint.is_none());
        assert!(config.service_name.is_empty());
        assert!(config.log_level.is_empty());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_fmt_layer_builds_for_both_formats() {
        use tracing_subscriber::layer::SubscriberExt;

        let _pretty = tracing_subscriber::registry().with(fmt_layer(LogFormat::Pretty));
        let _json = tracing_subscriber::registry().with(fmt_layer(LogFormat::Json));
    }

    #[test]
    fn test_shutdown_observability_no_panic() {
        shutdown_observability();
    }
}
