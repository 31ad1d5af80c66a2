//! HTTP server: router assembly and listener loop

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use super::{AppState, handlers};
use crate::auth::require_bearer;
use crate::config::ServerConfig;
use crate::constants::API_PREFIX;
use crate::observability::{RequestTracer, trace_requests};
use crate::{Error, Result};

/// Assemble the application router.
///
/// Layers, outermost first: request tracing, CORS, request timeout, panic
/// catcher. Identity and cache admin routes additionally require a bearer
/// token.
pub fn build_router(state: AppState, config: &ServerConfig, tracer: RequestTracer) -> Router {
    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route("/cache/stats", get(handlers::cache_stats))
        .route("/cache/clear", post(handlers::cache_clear))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.gate),
            require_bearer,
        ));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/generate", post(handlers::generate))
        .route("/explain", post(handlers::explain))
        .route("/detect-bugs", post(handlers::detect_bugs))
        .route("/refactor", post(handlers::refactor))
        .route("/document", post(handlers::document))
        .route("/login", post(handlers::login))
        .merge(protected);

    #[allow(unused_mut)]
    let mut app = Router::new().route("/", get(handlers::root));

    #[cfg(feature = "metrics")]
    {
        app = app.route("/metrics", get(handlers::metrics));
    }

    app.nest(API_PREFIX, api)
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(build_cors_layer(&config.cors_origins))
        .layer(middleware::from_fn_with_state(tracer, trace_requests))
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn run_http(
    state: AppState,
    config: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::new(config.host, config.port);
    emit_security_warnings(config.host);

    let app = build_router(state, config, RequestTracer::default());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Transport(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server shutdown complete");
    Ok(())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::info!("No CORS origins configured, cross-origin requests will be refused");
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn emit_security_warnings(host: IpAddr) {
    let is_all_interfaces =
        host == IpAddr::V4(Ipv4Addr::UNSPECIFIED) || host == IpAddr::V6(Ipv6Addr::UNSPECIFIED);

    if is_all_interfaces {
        tracing::warn!(
            "HTTP server binding to all interfaces ({host}). \
             Completion endpoints are unauthenticated and reachable from the network."
        );
    } else if !host.is_loopback() {
        tracing::warn!(
            "HTTP server binding to non-loopback address ({host}). \
             Ensure network security policies are in place."
        );
    }
}
