//! Credential verification backed by argon2 PHC hashes

use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::config::UserCredential;
use super::error::{AuthError, Result};

/// Source of truth for login secrets.
///
/// Implementations are synchronous and may be CPU heavy; callers run them off
/// the async executor.
pub trait CredentialStore: Send + Sync {
    /// Whether `secret` is the secret of `subject`
    fn verify(&self, subject: &str, secret: &str) -> bool;
}

/// Hash a secret into an argon2id PHC string
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Config(format!("failed to hash secret: {e}")))
}

fn verify_secret(secret: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Fixed set of users loaded from configuration
pub struct StaticCredentials {
    users: HashMap<String, String>,
    // Verified against for unknown subjects so both failures cost the same
    decoy_hash: String,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("users", &self.users.len())
            .finish_non_exhaustive()
    }
}

impl StaticCredentials {
    /// Build from configured users, rejecting hashes that are not PHC strings
    pub fn new(users: &[UserCredential]) -> Result<Self> {
        let mut map = HashMap::with_capacity(users.len());
        for user in users {
            PasswordHash::new(&user.secret_hash).map_err(|e| {
                AuthError::Config(format!("invalid secret hash for '{}': {e}", user.subject))
            })?;
            map.insert(user.subject.clone(), user.secret_hash.clone());
        }

        Ok(Self {
            users: map,
            decoy_hash: hash_secret("decoy")?,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialStore for StaticCredentials {
    fn verify(&self, subject: &str, secret: &str) -> bool {
        match self.users.get(subject) {
            Some(hash) => verify_secret(secret, hash),
            None => {
                let _ = verify_secret(secret, &self.decoy_hash);
                false
            }
        }
    }
}
