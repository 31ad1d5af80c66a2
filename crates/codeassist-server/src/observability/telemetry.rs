//! OpenTelemetry initialization

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use super::fmt_layer;
use crate::Result;
use crate::config::TelemetryConfig;
use crate::constants::SERVICE_VERSION;

static TRACER_PROVIDER: std::sync::OnceLock<SdkTracerProvider> = std::sync::OnceLock::new();

/// Initialize logging, exporting spans over OTLP when an endpoint is set
pub fn init_telemetry(config: &TelemetryConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let Some(endpoint) = config.otlp_endpoint.as_deref() else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer(config.log_format))
            .init();

        tracing::debug!("OpenTelemetry disabled (no endpoint configured)");
        return Ok(());
    };

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attribute(KeyValue::new("service.version", SERVICE_VERSION))
        .build();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| crate::Error::Config(format!("Failed to create OTLP exporter: {e}")))?;

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build();

    let tracer = provider.tracer(config.service_name.clone());
    let _ = TRACER_PROVIDER.set(provider);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(config.log_format))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    tracing::info!(endpoint, "OpenTelemetry initialized");
    Ok(())
}

/// Shutdown OpenTelemetry and flush pending traces
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        tracing::warn!("Failed to shutdown tracer provider: {e:?}");
    }
}
