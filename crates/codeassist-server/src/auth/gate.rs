//! Login and token validation entry point

use std::sync::Arc;

use super::claims::AuthenticatedUser;
use super::config::AuthConfig;
use super::credentials::{CredentialStore, StaticCredentials};
use super::error::{AuthError, Result};
use super::jwt::{IssuedToken, TokenService};

/// Issues tokens for verified subjects and validates presented tokens
pub struct AuthGate {
    tokens: TokenService,
    credentials: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    /// Build a gate whose users come from configuration
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let credentials = StaticCredentials::new(&config.users)?;
        if credentials.is_empty() {
            tracing::warn!("No users configured, login will always fail");
        }
        Self::new(config, Arc::new(credentials))
    }

    pub fn new(config: &AuthConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        Ok(Self {
            tokens: TokenService::new(config)?,
            credentials,
        })
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown subject and wrong secret produce the same error.
    pub async fn login(&self, subject: &str, secret: &str) -> Result<IssuedToken> {
        let store = Arc::clone(&self.credentials);
        let (subject_owned, secret_owned) = (subject.to_string(), secret.to_string());

        let verified = tokio::task::spawn_blocking(move || store.verify(&subject_owned, &secret_owned))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Credential verification task failed");
                false
            });

        if !verified {
            tracing::info!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.tokens.issue(subject)?;
        tracing::info!(subject, expires_at = %issued.expires_at, "Token issued");
        Ok(issued)
    }

    pub fn validate(&self, token: &str) -> Result<AuthenticatedUser> {
        self.tokens.validate(token)
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}
