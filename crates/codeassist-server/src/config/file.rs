//! TOML configuration file loading

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::builder::{ConfigBuilder, LogFormat};
use crate::Result;
use crate::auth::UserCredential;
use crate::cache::CacheBackend;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./codeassist.toml",
    "~/.config/codeassist/config.toml",
    "/etc/codeassist/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    if let Some(server) = config.server {
        if let Some(host_str) = server.host
            && let Ok(host) = host_str.parse::<IpAddr>()
        {
            builder = builder.host(host);
        }

        if let Some(port) = server.port {
            builder = builder.port(port);
        }

        if let Some(origins) = server.cors_origins {
            builder = builder.cors_origins(origins);
        }

        if let Some(secs) = server.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
    }

    if let Some(cache) = config.cache {
        if let Some(enabled) = cache.enabled {
            builder = builder.cache_enabled(enabled);
        }

        if let Some(backend_str) = cache.backend {
            let backend: CacheBackend = backend_str
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid cache backend: {e}")))?;
            builder = builder.cache_backend(backend);
        }

        if let Some(url) = cache.url {
            builder = builder.cache_url(url);
        }

        if let Some(secs) = cache.default_ttl_secs {
            builder = builder.cache_default_ttl(Duration::from_secs(secs));
        }

        if let Some(prefix) = cache.key_prefix {
            builder = builder.cache_key_prefix(prefix);
        }

        if let Some(ms) = cache.operation_timeout_ms {
            builder = builder.cache_operation_timeout(Duration::from_millis(ms));
        }

        if let Some(ms) = cache.admin_timeout_ms {
            builder = builder.cache_admin_timeout(Duration::from_millis(ms));
        }

        if let Some(max) = cache.max_entries {
            builder = builder.cache_max_entries(Some(max));
        }
    }

    if let Some(auth) = config.auth {
        if let Some(secret) = auth.signing_secret {
            builder = builder.signing_secret(secret);
        }

        if let Some(minutes) = auth.token_lifetime_minutes {
            builder = builder.token_lifetime(Duration::from_secs(minutes.saturating_mul(60)));
        }

        if !auth.users.is_empty() {
            builder = builder.users(auth.users);
        }
    }

    if let Some(gateway) = config.gateway {
        if let Some(key) = gateway.api_key {
            builder = builder.api_key(key);
        }

        if let Some(url_str) = gateway.base_url {
            let url = Url::parse(&url_str)
                .map_err(|e| crate::Error::Config(format!("Invalid gateway base URL: {e}")))?;
            builder = builder.gateway_base_url(url);
        }

        if let Some(model) = gateway.model {
            builder = builder.model(model);
        }

        if let Some(temperature) = gateway.temperature {
            builder = builder.temperature(temperature);
        }

        if let Some(max_tokens) = gateway.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        if let Some(secs) = gateway.timeout_secs {
            builder = builder.gateway_timeout(Duration::from_secs(secs));
        }
    }

    if let Some(obs) = config.observability {
        if let Some(endpoint) = obs.otlp_endpoint {
            builder = builder.otlp_endpoint(Some(endpoint));
        }

        if let Some(name) = obs.service_name {
            builder = builder.service_name(name);
        }

        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }

        if let Some(format) = obs.log_format {
            builder = builder.log_format(format.parse::<LogFormat>().unwrap_or_default());
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    server: Option<ServerFileConfig>,
    cache: Option<CacheFileConfig>,
    auth: Option<AuthFileConfig>,
    gateway: Option<GatewayFileConfig>,
    observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Deserialize)]
struct ServerFileConfig {
    host: Option<String>,
    port: Option<u16>,
    cors_origins: Option<Vec<String>>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CacheFileConfig {
    enabled: Option<bool>,
    backend: Option<String>,
    url: Option<String>,
    default_ttl_secs: Option<u64>,
    key_prefix: Option<String>,
    operation_timeout_ms: Option<u64>,
    admin_timeout_ms: Option<u64>,
    max_entries: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct AuthFileConfig {
    signing_secret: Option<String>,
    token_lifetime_minutes: Option<u64>,
    #[serde(default)]
    users: Vec<UserCredential>,
}

#[derive(Debug, Deserialize)]
struct GatewayFileConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ObservabilityConfig {
    otlp_endpoint: Option<String>,
    service_name: Option<String>,
    log_level: Option<String>,
    log_format: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[server]
host = "0.0.0.0"
port = 9000
cors_origins = ["https://ide.example.com"]
request_timeout_secs = 90

[cache]
enabled = true
backend = "redis"
url = "redis://redis:6379"
default_ttl_secs = 600
key_prefix = "ca"
operation_timeout_ms = 100

[auth]
signing_secret = "0123456789abcdef0123456789abcdef"
token_lifetime_minutes = 15

[[auth.users]]
subject = "alice"
secret_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"

[gateway]
api_key = "sk-file"
base_url = "https://llm.example.com/v1"
model = "gpt-4o-mini"
temperature = 0.3
max_tokens = 1024
timeout_secs = 30

[observability]
otlp_endpoint = "http://localhost:4317"
service_name = "test-assist"
log_level = "debug"
log_format = "json"
"#;

        let config: FileConfig = toml::from_str(toml_content).unwrap();

        assert!(config.server.is_some());
        assert!(config.cache.is_some());
        assert!(config.gateway.is_some());
        assert!(config.observability.is_some());

        let auth = config.auth.unwrap();
        assert_eq!(auth.token_lifetime_minutes, Some(15));
        assert_eq!(auth.users.len(), 1);
        assert_eq!(auth.users[0].subject, "alice");
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml_content = r#"
[auth]
signing_secret = "0123456789abcdef0123456789abcdef"
"#;

        let config: FileConfig = toml::from_str(toml_content).unwrap();
        assert!(config.auth.is_some());
        assert!(config.server.is_none());
        assert!(config.cache.is_none());
    }

    #[test]
    fn test_load_from_file_success() {
        let toml_content = r#"
[server]
port = 9000

[cache]
backend = "memory"
default_ttl_secs = 600
admin_timeout_ms = 2500
max_entries = 50

[auth]
signing_secret = "0123456789abcdef0123456789abcdef"
token_lifetime_minutes = 15
"#;
        let temp_file = create_temp_config(toml_content);

        let builder = load_from_file(temp_file.path(), ConfigBuilder::new()).unwrap();
        let config = builder.build().unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(600));
        assert_eq!(config.cache.max_entries, Some(50));
        assert_eq!(config.cache.admin_timeout, Duration::from_millis(2500));
        assert_eq!(config.auth.token_lifetime, Duration::from_secs(900));
    }

    #[test]
    fn test_load_huge_token_lifetime_saturates() {
        let toml_content = format!(
            "[auth]\nsigning_secret = \"0123456789abcdef0123456789abcdef\"\ntoken_lifetime_minutes = {}\n",
            i64::MAX
        );
        let temp_file = create_temp_config(&toml_content);

        let config = load_from_file(temp_file.path(), ConfigBuilder::new())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.auth.token_lifetime, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(
            Path::new("/nonexistent/path/config.toml"),
            ConfigBuilder::new(),
        );
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let temp_file = create_temp_config("this is not valid toml {{{{");

        let result = load_from_file(temp_file.path(), ConfigBuilder::new());
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_invalid_backend() {
        let temp_file = create_temp_config("[cache]\nbackend = \"memcached\"\n");

        let err = load_from_file(temp_file.path(), ConfigBuilder::new()).unwrap_err();
        assert!(err.to_string().contains("Invalid cache backend"));
    }

    #[test]
    fn test_load_invalid_gateway_url() {
        let temp_file = create_temp_config("[gateway]\nbase_url = \"not a valid url\"\n");

        let err = load_from_file(temp_file.path(), ConfigBuilder::new()).unwrap_err();
        assert!(err.to_string().contains("Invalid gateway base URL"));
    }

    #[test]
    fn test_load_invalid_host_ignored() {
        let toml_content = r#"
[server]
host = "not_an_ip"

[auth]
signing_secret = "0123456789abcdef0123456789abcdef"
"#;
        let temp_file = create_temp_config(toml_content);

        let config = load_from_file(temp_file.path(), ConfigBuilder::new())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.server.host, "127.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_load_observability_config() {
        let toml_content = r#"
[auth]
signing_secret = "0123456789abcdef0123456789abcdef"

[observability]
otlp_endpoint = "http://jaeger:4317"
service_name = "my-service"
log_level = "trace"
log_format = "json"
"#;
        let temp_file = create_temp_config(toml_content);

        let config = load_from_file(temp_file.path(), ConfigBuilder::new())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            config.telemetry.otlp_endpoint,
            Some("http://jaeger:4317".to_string())
        );
        assert_eq!(config.telemetry.service_name, "my-service");
        assert_eq!(config.telemetry.log_level, "trace");
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
    }

    #[test]
    fn test_file_overrides_cli_values() {
        let temp_file = create_temp_config("[server]\nport = 7000\n");

        let builder = ConfigBuilder::new().port(6000).host(IpAddr::from([10, 0, 0, 1]));
        let config = load_from_file(temp_file.path(), builder)
            .unwrap()
            .signing_secret("0123456789abcdef0123456789abcdef".into())
            .build()
            .unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, IpAddr::from([10, 0, 0, 1]));
    }

    #[test]
    fn test_empty_config_file() {
        let temp_file = create_temp_config("");

        let builder = load_from_file(temp_file.path(), ConfigBuilder::new()).unwrap();
        let result = builder.build();
        assert!(result.is_err());
    }

    #[test]
    fn test_find_config_file_not_found() {
        let result = find_config_file();
        assert!(result.is_none() || result.unwrap().exists());
    }
}
