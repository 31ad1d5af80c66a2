//! Field-level validation of operation inputs

use serde::Serialize;
use thiserror::Error;

use crate::completion::FieldName;
use crate::constants::{MAX_CODE_LENGTH, MAX_LABEL_LENGTH, MAX_TEXT_LENGTH};

/// A rejected input field
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Maximum accepted length for a field, in bytes
#[must_use]
pub const fn max_length(field: FieldName) -> usize {
    match field {
        FieldName::Code => MAX_CODE_LENGTH,
        FieldName::Prompt | FieldName::Context | FieldName::Instructions => MAX_TEXT_LENGTH,
        FieldName::Language | FieldName::Style => MAX_LABEL_LENGTH,
    }
}

/// Require a present field with non-whitespace content
pub fn validate_required(field: FieldName, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        None => Err(ValidationError::new(field.as_str(), "field required")),
        Some(v) if v.trim().is_empty() => {
            Err(ValidationError::new(field.as_str(), "must not be empty"))
        }
        Some(_) => Ok(()),
    }
}

/// Reject values longer than the field's limit
pub fn validate_field_length(field: FieldName, value: &str) -> Result<(), ValidationError> {
    let max = max_length(field);
    if value.len() > max {
        return Err(ValidationError::new(
            field.as_str(),
            format!("must be at most {max} bytes (got {})", value.len()),
        ));
    }
    Ok(())
}

/// Require a non-empty credential value
pub fn validate_credential(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}
