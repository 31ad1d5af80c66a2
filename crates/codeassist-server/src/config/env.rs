//! Environment variable loading for configuration

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use url::Url;

use super::builder::{ConfigBuilder, LogFormat};
use crate::Result;
use crate::cache::CacheBackend;

/// Environment variable names
mod vars {
    pub const HOST: &str = "CODEASSIST_HOST";
    pub const PORT: &str = "CODEASSIST_PORT";
    pub const CORS_ORIGINS: &str = "CODEASSIST_CORS_ORIGINS";
    pub const REQUEST_TIMEOUT_SECS: &str = "CODEASSIST_REQUEST_TIMEOUT_SECS";
    pub const CACHE_ENABLED: &str = "CODEASSIST_CACHE_ENABLED";
    pub const CACHE_BACKEND: &str = "CODEASSIST_CACHE_BACKEND";
    pub const REDIS_URL: &str = "REDIS_URL";
    pub const CACHE_TTL_SECS: &str = "CODEASSIST_CACHE_TTL_SECS";
    pub const CACHE_PREFIX: &str = "CODEASSIST_CACHE_PREFIX";
    pub const CACHE_TIMEOUT_MS: &str = "CODEASSIST_CACHE_TIMEOUT_MS";
    pub const CACHE_ADMIN_TIMEOUT_MS: &str = "CODEASSIST_CACHE_ADMIN_TIMEOUT_MS";
    pub const SECRET_KEY: &str = "CODEASSIST_SECRET_KEY";
    pub const TOKEN_MINUTES: &str = "CODEASSIST_TOKEN_MINUTES";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
    pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
    pub const GATEWAY_TIMEOUT_SECS: &str = "CODEASSIST_GATEWAY_TIMEOUT_SECS";
    pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
    pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    // Server
    if let Ok(host_str) = env::var(vars::HOST)
        && let Ok(host) = host_str.parse::<IpAddr>()
    {
        builder = builder.host(host);
    }

    if let Ok(port_str) = env::var(vars::PORT)
        && let Ok(port) = port_str.parse::<u16>()
    {
        builder = builder.port(port);
    }

    if let Ok(origins) = env::var(vars::CORS_ORIGINS) {
        builder = builder.cors_origins(split_list(&origins));
    }

    if let Ok(secs_str) = env::var(vars::REQUEST_TIMEOUT_SECS)
        && let Ok(secs) = secs_str.parse::<u64>()
    {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }

    // Cache
    if let Ok(val) = env::var(vars::CACHE_ENABLED) {
        builder = builder.cache_enabled(parse_bool(&val));
    }

    if let Ok(backend_str) = env::var(vars::CACHE_BACKEND) {
        let backend: CacheBackend = backend_str.parse().map_err(|e| {
            crate::Error::Config(format!("Invalid {}: {e}", vars::CACHE_BACKEND))
        })?;
        builder = builder.cache_backend(backend);
    }

    if let Ok(url) = env::var(vars::REDIS_URL) {
        builder = builder.cache_url(url);
    }

    if let Ok(ttl_str) = env::var(vars::CACHE_TTL_SECS)
        && let Ok(secs) = ttl_str.parse::<u64>()
    {
        builder = builder.cache_default_ttl(Duration::from_secs(secs));
    }

    if let Ok(prefix) = env::var(vars::CACHE_PREFIX) {
        builder = builder.cache_key_prefix(prefix);
    }

    if let Ok(ms_str) = env::var(vars::CACHE_TIMEOUT_MS)
        && let Ok(ms) = ms_str.parse::<u64>()
    {
        builder = builder.cache_operation_timeout(Duration::from_millis(ms));
    }

    if let Ok(ms_str) = env::var(vars::CACHE_ADMIN_TIMEOUT_MS)
        && let Ok(ms) = ms_str.parse::<u64>()
    {
        builder = builder.cache_admin_timeout(Duration::from_millis(ms));
    }

    // Auth
    if let Ok(secret) = env::var(vars::SECRET_KEY) {
        builder = builder.signing_secret(secret);
    }

    if let Ok(minutes_str) = env::var(vars::TOKEN_MINUTES)
        && let Ok(minutes) = minutes_str.parse::<u64>()
    {
        builder = builder.token_lifetime(Duration::from_secs(minutes.saturating_mul(60)));
    }

    // Gateway
    if let Ok(key) = env::var(vars::OPENAI_API_KEY) {
        builder = builder.api_key(key);
    }

    if let Ok(url_str) = env::var(vars::OPENAI_BASE_URL) {
        let url = Url::parse(&url_str).map_err(|e| {
            crate::Error::Config(format!("Invalid {}: {e}", vars::OPENAI_BASE_URL))
        })?;
        builder = builder.gateway_base_url(url);
    }

    if let Ok(model) = env::var(vars::OPENAI_MODEL) {
        builder = builder.model(model);
    }

    if let Ok(secs_str) = env::var(vars::GATEWAY_TIMEOUT_SECS)
        && let Ok(secs) = secs_str.parse::<u64>()
    {
        builder = builder.gateway_timeout(Duration::from_secs(secs));
    }

    // Telemetry
    if let Ok(endpoint) = env::var(vars::OTEL_EXPORTER_OTLP_ENDPOINT) {
        builder = builder.otlp_endpoint(Some(endpoint));
    }

    if let Ok(name) = env::var(vars::OTEL_SERVICE_NAME) {
        builder = builder.service_name(name);
    }

    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(format) = env::var(vars::LOG_FORMAT) {
        let format: LogFormat = format.parse().unwrap_or_default();
        builder = builder.log_format(format);
    }

    Ok(builder)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
