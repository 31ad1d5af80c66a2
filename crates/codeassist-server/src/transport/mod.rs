//! HTTP transport
//!
//! Routes, middleware stack and the server loop.

mod handlers;
mod http;

use std::sync::Arc;

pub use http::{build_router, run_http};

use crate::assistant::CodeAssistant;
use crate::auth::AuthGate;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub assistant: CodeAssistant,
    pub gate: Arc<AuthGate>,
}

impl AppState {
    pub fn new(assistant: CodeAssistant, gate: AuthGate) -> Self {
        Self {
            assistant,
            gate: Arc::new(gate),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode, header};
    use chrono::Utc;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::assistant::tests::CountingGateway;
    use crate::auth::{AuthConfig, hash_secret};
    use crate::cache::{CacheConfig, InMemoryCache, ResponseCache};
    use crate::config::ServerConfig;
    use crate::constants::{HEADER_PROCESS_TIME, HEADER_REQUEST_ID};
    use crate::observability::{MemorySink, RequestTracer, TraceEvent};

    const SECRET: &str = "scenario-secret-key-at-least-32-bytes";
    const USER: &str = "admin";
    const PASSWORD: &str = "correct horse battery staple";

    struct Harness {
        app: Router,
        gateway: Arc<CountingGateway>,
        sink: Arc<MemorySink>,
        state: AppState,
    }

    impl Harness {
        fn new(cache: ResponseCache, gateway: CountingGateway) -> Self {
            let auth = AuthConfig::new(SECRET).with_user(USER, hash_secret(PASSWORD).unwrap());
            let gateway = Arc::new(gateway);
            let state = AppState::new(
                CodeAssistant::new(cache, gateway.clone()),
                AuthGate::from_config(&auth).unwrap(),
            );
            let sink = Arc::new(MemorySink::new());
            let app = build_router(
                state.clone(),
                &ServerConfig::default(),
                RequestTracer::new(sink.clone()),
            );
            Self {
                app,
                gateway,
                sink,
                state,
            }
        }

        fn with_memory_cache() -> Self {
            let store = InMemoryCache::new();
            let cache = ResponseCache::new(Arc::new(store), &CacheConfig::memory());
            Self::new(cache, CountingGateway::default())
        }

        async fn send(&self, request: Request<Body>) -> Response<Body> {
            self.app.clone().oneshot(request).await.unwrap()
        }

        async fn login(&self) -> String {
            let response = self
                .send(post_json(
                    "/api/v1/login",
                    &json!({ "subject": USER, "secret": PASSWORD }),
                ))
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            json_body(response).await["accessToken"]
                .as_str()
                .unwrap()
                .to_string()
        }
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let harness = Harness::with_memory_cache();

        let health = json_body(harness.send(get_with_token("/api/v1/health", None)).await).await;
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["service"], "codeassist-server");

        let root = harness.send(get_with_token("/", None)).await;
        assert_eq!(root.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_generate_miss_then_hit() {
        let harness = Harness::with_memory_cache();
        let body = json!({ "prompt": "add two numbers", "language": "python" });

        let first = harness.send(post_json("/api/v1/generate", &body)).await;
        assert_eq!(first.status(), StatusCode::OK);
        let first = json_body(first).await;

        let recased = json!({ "prompt": "add two numbers", "language": "Python" });
        let second = json_body(harness.send(post_json("/api/v1/generate", &recased)).await).await;

        assert_eq!(first, second);
        assert_eq!(first["success"], true);
        assert_eq!(first["language"], "python");
        assert_eq!(harness.gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_detect_bugs_response_shape() {
        let harness = Harness::with_memory_cache();

        let response = harness
            .send(post_json("/api/v1/detect-bugs", &json!({ "code": "x = 1 / 0" })))
            .await;
        let body = json_body(response).await;

        assert_eq!(body["code"], "x = 1 / 0");
        assert_eq!(body["language"], "python");
        assert_eq!(body["bugs"][0]["severity"], "info");
        assert_eq!(body["explanation"], "Found 1 potential issue(s)");
    }

    #[tokio::test]
    async fn test_response_headers_match_access_record() {
        let harness = Harness::with_memory_cache();

        let response = harness
            .send(post_json("/api/v1/explain", &json!({ "code": "print(1)" })))
            .await;
        let request_id = response.headers()[HEADER_REQUEST_ID]
            .to_str()
            .unwrap()
            .to_string();
        assert!(response.headers().contains_key(HEADER_PROCESS_TIME));

        let records = harness.sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request_id, request_id);
        assert_eq!(records[0].event, TraceEvent::RequestCompleted);
        assert_eq!(records[0].path, "/api/v1/explain");
        assert_eq!(records[0].status_code, 200);
    }

    #[tokio::test]
    async fn test_missing_required_field_is_422() {
        let harness = Harness::with_memory_cache();

        let response = harness
            .send(post_json("/api/v1/generate", &json!({ "language": "rust" })))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.headers().contains_key(HEADER_REQUEST_ID));

        let body = json_body(response).await;
        assert_eq!(body["detail"][0]["field"], "prompt");
        assert_eq!(harness.gateway.calls(), 0);
        assert_eq!(harness.sink.records()[0].status_code, 422);
    }

    #[tokio::test]
    async fn test_malformed_json_is_422() {
        let harness = Harness::with_memory_cache();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/refactor")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = harness.send(request).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_502_and_traced() {
        let cache = ResponseCache::new(Arc::new(InMemoryCache::new()), &CacheConfig::memory());
        let harness = Harness::new(cache, CountingGateway::failing());

        let response = harness
            .send(post_json("/api/v1/document", &json!({ "code": "def f(): pass" })))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            json_body(response).await["detail"],
            "Documentation generation failed: upstream error"
        );
        assert_eq!(harness.sink.records()[0].status_code, 502);
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let harness = Harness::with_memory_cache();

        for uri in ["/api/v1/me", "/api/v1/cache/stats"] {
            let response = harness.send(get_with_token(uri, None)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
        }

        let clear = Request::builder()
            .method("POST")
            .uri("/api/v1/cache/clear")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(harness.send(clear).await.status(), StatusCode::UNAUTHORIZED);

        let records = harness.sink.records();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.status_code == 401));
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_secret() {
        let harness = Harness::with_memory_cache();

        for body in [
            json!({ "subject": USER, "secret": "wrong" }),
            json!({ "subject": "nobody", "secret": PASSWORD }),
        ] {
            let response = harness.send(post_json("/api/v1/login", &body)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(json_body(response).await["detail"], "Invalid credentials");
        }
    }

    #[tokio::test]
    async fn test_login_with_empty_subject_is_422() {
        let harness = Harness::with_memory_cache();

        let response = harness
            .send(post_json("/api/v1/login", &json!({ "secret": PASSWORD })))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["detail"][0]["field"], "subject");
    }

    #[tokio::test]
    async fn test_admin_flow_with_token() {
        let harness = Harness::with_memory_cache();
        for _ in 0..2 {
            harness
                .send(post_json("/api/v1/generate", &json!({ "prompt": "add" })))
                .await;
        }

        let token = harness.login().await;

        let me = json_body(harness.send(get_with_token("/api/v1/me", Some(&token))).await).await;
        assert_eq!(me["subject"], USER);

        let stats = harness
            .send(get_with_token("/api/v1/cache/stats", Some(&token)))
            .await;
        assert_eq!(stats.status(), StatusCode::OK);
        let stats = json_body(stats).await;
        assert_eq!(stats["enabled"], true);
        assert_eq!(stats["keys"], 1);
        assert_eq!(stats["hitCount"], 1);
        assert_eq!(stats["missCount"], 1);

        let clear = Request::builder()
            .method("POST")
            .uri("/api/v1/cache/clear")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let cleared = json_body(harness.send(clear).await).await;
        assert_eq!(cleared["removed"], 1);

        harness
            .send(post_json("/api/v1/generate", &json!({ "prompt": "add" })))
            .await;
        assert_eq!(harness.gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let harness = Harness::with_memory_cache();
        let expired = harness
            .state
            .gate
            .tokens()
            .issue_at(USER, Utc::now() - chrono::Duration::hours(2))
            .unwrap()
            .access_token;

        let response = harness
            .send(get_with_token("/api/v1/me", Some(&expired)))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["detail"], "Not authenticated");
    }

    #[tokio::test]
    async fn test_stats_when_cache_disabled() {
        let cache = ResponseCache::from_config(&CacheConfig::disabled()).unwrap();
        let harness = Harness::new(cache, CountingGateway::default());
        let token = harness.login().await;

        let stats = json_body(
            harness
                .send(get_with_token("/api/v1/cache/stats", Some(&token)))
                .await,
        )
        .await;
        assert_eq!(stats, json!({ "enabled": false }));
    }

    #[tokio::test]
    async fn test_unreachable_store_degrades() {
        let config = CacheConfig {
            url: "redis://127.0.0.1:1".into(),
            operation_timeout: Duration::from_millis(200),
            ..CacheConfig::default()
        };
        let harness = Harness::new(
            ResponseCache::from_config(&config).unwrap(),
            CountingGateway::default(),
        );

        let served = harness
            .send(post_json("/api/v1/generate", &json!({ "prompt": "add" })))
            .await;
        assert_eq!(served.status(), StatusCode::OK);

        let token = harness.login().await;
        let stats = json_body(
            harness
                .send(get_with_token("/api/v1/cache/stats", Some(&token)))
                .await,
        )
        .await;
        assert_eq!(stats["enabled"], true);
        assert!(stats["error"].is_string());
    }

    #[tokio::test]
    async fn test_cors_preflight_for_configured_origin() {
        let harness = Harness::with_memory_cache();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/generate")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = harness.send(request).await;
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }
}
