//! Bearer token middleware for protected routes

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

use super::claims::AuthenticatedUser;
use super::error::AuthError;
use super::gate::AuthGate;
use crate::error::Error;

/// Reject requests without a valid bearer token.
///
/// On success the [`AuthenticatedUser`] is placed in request extensions.
#[allow(clippy::future_not_send)]
pub async fn require_bearer(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let user = authenticate(request.headers(), &gate)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn authenticate(headers: &HeaderMap, gate: &AuthGate) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers).ok_or_else(|| {
        tracing::warn!("Missing or malformed Authorization header");
        AuthError::Unauthorized
    })?;

    gate.validate(token).map_err(|_e| {
        // Do not log error details to avoid leaking token information
        tracing::warn!("Bearer token rejected");
        AuthError::Unauthorized
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
