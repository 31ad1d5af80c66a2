use std::io::BufRead;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codeassist_server::config::{self, ConfigBuilder, LogFormat};
use codeassist_server::observability::{init_observability, shutdown_observability};
use codeassist_server::transport::{AppState, run_http};
use codeassist_server::{
    AuthGate, CacheBackend, CodeAssistant, OpenAiGateway, ResponseCache, hash_secret,
};

#[derive(Parser, Debug)]
#[command(name = "codeassist-server")]
#[command(about = "Caching HTTP gateway for AI code assistance", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP bind host
    #[arg(long)]
    host: Option<IpAddr>,

    /// HTTP bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Cache backend (redis, memory or noop)
    #[arg(long)]
    cache_backend: Option<CacheBackend>,

    /// Disable response caching
    #[arg(long)]
    no_cache: bool,

    /// Upper bound on a whole request in seconds
    #[arg(long)]
    request_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an argon2 hash for an `[[auth.users]]` entry
    HashSecret {
        /// Secret to hash; read from stdin when omitted
        secret: Option<String>,
    },
}

impl Args {
    /// Seed the builder with CLI values; file and environment override them
    fn into_builder(self) -> ConfigBuilder {
        let mut builder = ConfigBuilder::new();

        if let Some(host) = self.host {
            builder = builder.host(host);
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(backend) = self.cache_backend {
            builder = builder.cache_backend(backend);
        }
        if self.no_cache {
            builder = builder.cache_enabled(false);
        }
        if let Some(secs) = self.request_timeout {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if self.verbose {
            builder = builder.log_level("debug".to_string());
        }
        if self.json_logs {
            builder = builder.log_format(LogFormat::Json);
        }

        builder
    }
}

fn print_secret_hash(secret: Option<String>) -> anyhow::Result<()> {
    let secret = match secret {
        Some(secret) => secret,
        None => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if secret.is_empty() {
        anyhow::bail!("secret must not be empty");
    }

    println!("{}", hash_secret(&secret)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();

    if let Some(Command::HashSecret { secret }) = args.command.take() {
        return print_secret_hash(secret);
    }

    // Precedence: env > file > CLI > defaults
    let config_path = args.config.take();
    let builder = args.into_builder();
    let builder = match config_path {
        Some(path) => config::load_config_from_path(&path, builder)?,
        None => config::load_config(builder)?,
    };
    let config = builder.build()?;

    init_observability(&config.telemetry)?;

    if config.gateway.api_key.is_none() {
        anyhow::bail!("OPENAI_API_KEY must be set");
    }

    let gateway = OpenAiGateway::new(config.gateway.clone())?;
    let cache = ResponseCache::from_config(config.cache())?;
    match cache.health_check().await {
        Ok(()) => tracing::info!("Cache store reachable"),
        Err(e) => tracing::warn!(
            error = %e,
            "Cache store unreachable, serving without cache until it recovers"
        ),
    }
    let gate = AuthGate::from_config(config.auth())?;
    let state = AppState::new(CodeAssistant::new(cache, Arc::new(gateway)), gate);

    tracing::info!("Starting code assistant gateway");
    tracing::info!("Model: {}", config.gateway.model);
    tracing::info!(
        "Cache enabled: {}, backend: {}",
        config.cache.enabled,
        config.cache.backend.as_str()
    );
    tracing::info!("Token lifetime: {:?}", config.auth.token_lifetime);

    let result = run_http(state, &config.server, shutdown_signal()).await;

    shutdown_observability();

    result.map_err(Into::into)
}
