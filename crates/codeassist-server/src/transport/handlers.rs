//! Route handlers

use axum::Extension;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use serde::de::DeserializeOwned;
use tracing::info;

use super::AppState;
use crate::auth::AuthenticatedUser;
use crate::completion::{CompletionFields, OperationKind};
use crate::constants::{SERVICE_NAME, SERVICE_VERSION, STATUS_HEALTHY};
use crate::error::Result;
use crate::types::{
    CacheStatsResponse, ClearResponse, CodeRequest, CodeResponse, DocumentRequest,
    GenerateRequest, HealthResponse, LoginRequest, RefactorRequest, RootResponse, TokenResponse,
};
use crate::validation::{ValidationError, validate_credential};

/// Unwrap a JSON body, reporting malformed input as a validation failure
fn body<T: DeserializeOwned>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ValidationError::new("body", rejection.body_text()).into())
}

async fn complete(
    state: &AppState,
    kind: OperationKind,
    fields: CompletionFields,
) -> Result<Json<CodeResponse>> {
    let (request, completion) = state.assistant.execute(kind, fields).await?;
    info!(operation = %kind, cached = completion.cached, "Operation completed");
    Ok(Json(CodeResponse::from_payload(&request, completion.payload)))
}

pub(super) async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        service: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
        docs: env!("CARGO_PKG_REPOSITORY").to_string(),
    })
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: STATUS_HEALTHY.to_string(),
        version: SERVICE_VERSION.to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

pub(super) async fn generate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<CodeResponse>> {
    complete(&state, OperationKind::Generate, body(payload)?.into()).await
}

pub(super) async fn explain(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<CodeResponse>> {
    complete(&state, OperationKind::Explain, body(payload)?.into()).await
}

pub(super) async fn detect_bugs(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<CodeResponse>> {
    complete(&state, OperationKind::DetectBugs, body(payload)?.into()).await
}

pub(super) async fn refactor(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RefactorRequest>, JsonRejection>,
) -> Result<Json<CodeResponse>> {
    complete(&state, OperationKind::Refactor, body(payload)?.into()).await
}

pub(super) async fn document(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DocumentRequest>, JsonRejection>,
) -> Result<Json<CodeResponse>> {
    complete(&state, OperationKind::Document, body(payload)?.into()).await
}

pub(super) async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let LoginRequest { subject, secret } = body(payload)?;
    validate_credential("subject", &subject)?;
    validate_credential("secret", &secret)?;
    let issued = state.gate.login(&subject, &secret).await?;
    Ok(Json(TokenResponse::bearer(issued.access_token)))
}

pub(super) async fn me(Extension(user): Extension<AuthenticatedUser>) -> Json<AuthenticatedUser> {
    Json(user)
}

pub(super) async fn cache_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<CacheStatsResponse> {
    let response = match state.assistant.cache().stats().await {
        None => CacheStatsResponse::disabled(),
        Some(Ok(stats)) => stats.into(),
        Some(Err(e)) => {
            tracing::warn!(error = %e, subject = %user.subject, "Cache stats unavailable");
            CacheStatsResponse::unavailable(e.to_string())
        }
    };
    Json(response)
}

pub(super) async fn cache_clear(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ClearResponse>> {
    let removed = state.assistant.cache().clear().await?;

    #[cfg(feature = "metrics")]
    crate::observability::record_cache_cleared(removed);

    info!(subject = %user.subject, removed, "Response cache cleared");
    Ok(Json(ClearResponse { removed }))
}

#[cfg(feature = "metrics")]
pub(super) async fn metrics() -> impl axum::response::IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::observability::render_metrics(),
    )
}
