//! Authentication configuration types

use std::time::Duration;

use serde::Deserialize;

use super::error::{AuthError, Result};
use crate::constants::MIN_SECRET_LENGTH;

/// Default bearer token lifetime
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// A subject allowed to log in, with its argon2 PHC hash
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct UserCredential {
    pub subject: String,
    pub secret_hash: String,
}

impl std::fmt::Debug for UserCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredential")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Token signing and credential configuration
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub signing_secret: String,
    pub token_lifetime: Duration,
    pub users: Vec<UserCredential>,
}

// Secret is omitted entirely
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_lifetime", &self.token_lifetime)
            .field("users", &self.users)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            users: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_user(mut self, subject: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        self.users.push(UserCredential {
            subject: subject.into(),
            secret_hash: secret_hash.into(),
        });
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.signing_secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::Config(format!(
                "signing secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        if self.token_lifetime.is_zero() {
            return Err(AuthError::Config("token lifetime must be positive".into()));
        }
        Ok(())
    }
}
