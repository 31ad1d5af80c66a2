//! Bearer token issue and validation

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use super::claims::{AuthenticatedUser, TokenClaims};
use super::config::AuthConfig;
use super::error::{AuthError, Result};

/// A freshly signed token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 token signer and validator
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime_secs: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &Algorithm::HS256)
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        config.validate()?;

        let lifetime_secs = i64::try_from(config.token_lifetime.as_secs())
            .map_err(|_| AuthError::Config("token lifetime out of range".into()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let secret = config.signing_secret.as_bytes();
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime_secs,
        })
    }

    pub fn issue(&self, subject: &str) -> Result<IssuedToken> {
        self.issue_at(subject, Utc::now())
    }

    /// Sign a token as if it had been issued at `issued_at`
    pub fn issue_at(&self, subject: &str, issued_at: DateTime<Utc>) -> Result<IssuedToken> {
        let iat = issued_at.timestamp();
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat,
            exp: iat.saturating_add(self.lifetime_secs),
        };

        let access_token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| AuthError::TokenIssue(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC),
        })
    }

    pub fn validate(&self, token: &str) -> Result<AuthenticatedUser> {
        let data =
            jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;

        // The library accepts exp == now; a token is valid only strictly before expiry
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Unauthorized);
        }

        Ok(AuthenticatedUser::from_claims(&data.claims))
    }
}
