//! Authentication error types

use thiserror::Error;

/// Authentication failures.
///
/// Token problems of every kind (missing, malformed, tampered, expired)
/// collapse into [`AuthError::Unauthorized`] so the reason never reaches the
/// caller. Login failures collapse into [`AuthError::InvalidCredentials`]
/// whether the subject is unknown or the secret is wrong.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not authenticated")]
    Unauthorized,

    #[error("token issue failed: {0}")]
    TokenIssue(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether the failure is attributable to the caller
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::Unauthorized)
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(_err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
