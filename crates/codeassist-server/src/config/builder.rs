//! Configuration builder

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::Error;
use crate::auth::{AuthConfig, DEFAULT_TOKEN_LIFETIME, UserCredential};
use crate::cache::{CacheBackend, CacheConfig};
use crate::completion::GatewayConfig;
use crate::constants::SERVICE_NAME;

/// Default CORS origins for local front-ends
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:8080"];

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthConfig {
        &self.auth
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Upper bound on a whole request, gateway call included
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            port: 8000,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(ToString::to_string).collect(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        })
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    server: ServerConfig,
    cache: CacheConfig,
    signing_secret: Option<String>,
    token_lifetime: Duration,
    users: Vec<UserCredential>,
    gateway: GatewayConfig,
    telemetry: TelemetryConfig,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            signing_secret: None,
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            users: Vec::new(),
            gateway: GatewayConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    // Server

    #[must_use]
    pub const fn host(mut self, host: IpAddr) -> Self {
        self.server.host = host;
        self
    }

    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    #[must_use]
    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.server.cors_origins = origins;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.server.request_timeout = timeout;
        self
    }

    // Cache

    #[must_use]
    pub const fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    #[must_use]
    pub const fn cache_backend(mut self, backend: CacheBackend) -> Self {
        self.cache.backend = backend;
        self
    }

    /// Set the shared store address
    #[must_use]
    pub fn cache_url(mut self, url: String) -> Self {
        self.cache.url = url;
        self
    }

    #[must_use]
    pub const fn cache_default_ttl(mut self, ttl: Duration) -> Self {
        self.cache.default_ttl = ttl;
        self
    }

    #[must_use]
    pub fn cache_key_prefix(mut self, prefix: String) -> Self {
        self.cache.key_prefix = prefix;
        self
    }

    #[must_use]
    pub const fn cache_operation_timeout(mut self, timeout: Duration) -> Self {
        self.cache.operation_timeout = timeout;
        self
    }

    /// Bound on `clear` and `stats`, which may scan the whole namespace
    #[must_use]
    pub const fn cache_admin_timeout(mut self, timeout: Duration) -> Self {
        self.cache.admin_timeout = timeout;
        self
    }

    /// Set maximum entries for the in-memory backend
    #[must_use]
    pub const fn cache_max_entries(mut self, max: Option<usize>) -> Self {
        self.cache.max_entries = max;
        self
    }

    // Auth

    #[must_use]
    pub fn signing_secret(mut self, secret: String) -> Self {
        self.signing_secret = Some(secret);
        self
    }

    #[must_use]
    pub const fn token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn users(mut self, users: Vec<UserCredential>) -> Self {
        self.users = users;
        self
    }

    // Gateway

    #[must_use]
    pub fn api_key(mut self, key: String) -> Self {
        self.gateway.api_key = Some(key);
        self
    }

    #[must_use]
    pub fn gateway_base_url(mut self, url: Url) -> Self {
        self.gateway.base_url = url;
        self
    }

    #[must_use]
    pub fn model(mut self, model: String) -> Self {
        self.gateway.model = model;
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.gateway.temperature = temperature;
        self
    }

    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.gateway.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub const fn gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway.timeout = timeout;
        self
    }

    // Telemetry

    #[must_use]
    pub fn otlp_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.telemetry.otlp_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn service_name(mut self, name: String) -> Self {
        self.telemetry.service_name = name;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.telemetry.log_level = level;
        self
    }

    #[must_use]
    pub const fn log_format(mut self, format: LogFormat) -> Self {
        self.telemetry.log_format = format;
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::Result<Config> {
        let signing_secret = self
            .signing_secret
            .ok_or_else(|| Error::Config("auth signing secret is required".into()))?;

        let auth = AuthConfig {
            signing_secret,
            token_lifetime: self.token_lifetime,
            users: self.users,
        };
        auth.validate().map_err(|e| Error::Config(e.to_string()))?;

        if self.cache.key_prefix.is_empty() {
            return Err(Error::Config("cache key prefix must not be empty".into()));
        }

        let service_name = if self.telemetry.service_name.is_empty() {
            SERVICE_NAME.to_string()
        } else {
            self.telemetry.service_name
        };

        let log_level = if self.telemetry.log_level.is_empty() {
            "info".to_string()
        } else {
            self.telemetry.log_level
        };

        Ok(Config {
            server: self.server,
            cache: self.cache,
            auth,
            gateway: self.gateway,
            telemetry: TelemetryConfig {
                otlp_endpoint: self.telemetry.otlp_endpoint,
                service_name,
                log_level,
                log_format: self.telemetry.log_format,
            },
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
