//! Authentication for management endpoints
//!
//! Stateless HS256 bearer tokens via `jsonwebtoken`. Login secrets are
//! verified against argon2 PHC hashes from configuration.
//!
//! # Guarantees
//!
//! - A token is valid iff its signature verifies and the current time is
//!   strictly before its expiry. There is no revocation.
//! - Failures never reveal why: every rejected token is
//!   [`AuthError::Unauthorized`] and every rejected login is
//!   [`AuthError::InvalidCredentials`].

mod claims;
mod config;
mod credentials;
mod error;
mod gate;
mod jwt;
mod middleware;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use config::{AuthConfig, DEFAULT_TOKEN_LIFETIME, UserCredential};
pub use credentials::{CredentialStore, StaticCredentials, hash_secret};
pub use error::{AuthError, Result};
pub use gate::AuthGate;
pub use jwt::{IssuedToken, TokenService};
pub use middleware::require_bearer;
