//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > CLI > defaults.
//! Callers seed the builder with CLI values; the file and then the
//! environment are layered on top.

mod builder;
mod env;
mod file;

use std::path::Path;

pub use builder::{
    Config, ConfigBuilder, DEFAULT_CORS_ORIGINS, LogFormat, ServerConfig, TelemetryConfig,
};

use crate::Result;

/// Serializes tests that read or mutate process environment
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Layer the discovered config file and the environment over `builder`
pub fn load_config(builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let mut builder = builder;

    if let Some(path) = file::find_config_file() {
        tracing::info!("Loading configuration from {}", path.display());
        builder = file::load_from_file(&path, builder)?;
    }

    env::load_from_env(builder)
}

/// Layer a specific config file and the environment over `builder`
pub fn load_config_from_path(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let builder = file::load_from_file(path, builder)?;
    env::load_from_env(builder)
}
