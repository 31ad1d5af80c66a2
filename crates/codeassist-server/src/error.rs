use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::cache::CacheError;
use crate::completion::{OperationKind, UpstreamError};
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("{} failed: {source}", .operation.label())]
    Upstream {
        operation: OperationKind,
        #[source]
        source: UpstreamError,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    #[must_use]
    pub const fn upstream(operation: OperationKind, source: UpstreamError) -> Self {
        Self::Upstream { operation, source }
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }

    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// HTTP status this error maps to
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(e) if e.is_client_error() => StatusCode::UNAUTHORIZED,
            Self::Upstream { source, .. } if source.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Cache(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth(_) | Self::Cache(_) | Self::Config(_) | Self::Transport(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            Self::Validation(e) => json!({ "detail": [e] }),
            Self::Auth(AuthError::InvalidCredentials) => json!({ "detail": "Invalid credentials" }),
            Self::Auth(AuthError::Unauthorized) => json!({ "detail": "Not authenticated" }),
            Self::Upstream { operation, source } => {
                tracing::error!(operation = %operation, error = %source, "Upstream call failed");
                json!({ "detail": format!("{} failed: upstream error", operation.label()) })
            }
            Self::Cache(e) if e.is_unavailable() => json!({ "detail": "Cache unavailable" }),
            other => {
                tracing::error!(error = %other, "Request failed");
                json!({ "detail": "Internal server error" })
            }
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, Error>;
