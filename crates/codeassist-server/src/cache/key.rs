//! Fingerprints and cache keys
//!
//! A fingerprint is a SHA-256 digest over a canonical, length-prefixed
//! encoding of the operation kind and the present input fields in a fixed
//! field order. Absent fields are omitted, so "absent" and "present but
//! empty" hash differently.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::completion::{CompletionRequest, FieldName, NormalizedFields, OperationKind};

/// Stable digest of a logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    kind: OperationKind,
    digest: [u8; 32],
}

impl Fingerprint {
    /// Fingerprint of a validated request
    #[must_use]
    pub fn of(request: &CompletionRequest) -> Self {
        FingerprintBuilder::new(request.kind())
            .normalized(request.fields())
            .build()
    }

    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Namespaced store key: `{prefix}:{operation}:{hex digest}`
    #[must_use]
    pub fn cache_key(&self, prefix: &str) -> CacheKey {
        CacheKey(format!("{prefix}:{}:{}", self.kind.as_str(), self.to_hex()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.to_hex())
    }
}

/// Builds a [`Fingerprint`] from raw field values.
///
/// Values are normalized on insertion (trimmed; `language` lower-cased) and
/// hashed in canonical field order regardless of insertion order.
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    kind: OperationKind,
    fields: BTreeMap<FieldName, String>,
}

impl FingerprintBuilder {
    #[must_use]
    pub const fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    /// Add a field value, normalizing it
    #[must_use]
    pub fn field(mut self, name: FieldName, value: &str) -> Self {
        let trimmed = value.trim();
        let normalized = if name == FieldName::Language {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        };
        self.fields.insert(name, normalized);
        self
    }

    /// Add an optional field; `None` leaves the field absent
    #[must_use]
    pub fn optional_field(self, name: FieldName, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.field(name, v),
            None => self,
        }
    }

    /// Add every present field from an already-normalized set
    #[must_use]
    pub fn normalized(mut self, fields: &NormalizedFields) -> Self {
        for (name, value) in fields.iter() {
            self.fields.insert(name, value.to_string());
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Fingerprint {
        let mut hasher = Sha256::new();
        write_part(&mut hasher, self.kind.as_str().as_bytes());
        for (name, value) in &self.fields {
            write_part(&mut hasher, name.as_str().as_bytes());
            write_part(&mut hasher, value.as_bytes());
        }

        Fingerprint {
            kind: self.kind,
            digest: hasher.finalize().into(),
        }
    }
}

fn write_part(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Fully-qualified key in the shared store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key lives under `prefix:`
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(':'))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
