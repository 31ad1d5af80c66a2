//! Result shapes produced by the completion gateway
//!
//! A [`CompletionPayload`] is what the cache stores. It is tagged with the
//! operation that produced it, so a read can reject an entry whose shape does
//! not match the operation being served.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::OperationKind;

/// Severity of a detected bug
///
/// Serializes lowercase. Deserialization accepts any string or null, so one
/// oddly labelled finding never discards the rest of a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Map a free-form label, ignoring case; unrecognized labels are `Info`
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" | "trivial" => Self::Low,
            "medium" | "moderate" | "warning" | "warn" => Self::Medium,
            "high" | "major" | "error" => Self::High,
            "critical" | "severe" | "blocker" => Self::Critical,
            _ => Self::Info,
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map_or(Self::Info, Self::from_label))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// A single finding from bug detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub severity: Severity,
    pub description: String,
    pub suggestion: String,
}

impl Bug {
    /// Finding used when the gateway reply cannot be parsed as a list
    #[must_use]
    pub fn unstructured(raw_reply: &str) -> Self {
        Self {
            line: None,
            severity: Severity::Info,
            description: "Bug analysis completed".to_string(),
            suggestion: raw_reply.to_string(),
        }
    }
}

/// Tagged union over the five result shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CompletionPayload {
    Generate { code: String, explanation: String },
    Explain { explanation: String },
    DetectBugs { bugs: Vec<Bug> },
    Refactor { code: String, explanation: String },
    Document { documented_code: String },
}

impl CompletionPayload {
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Generate { .. } => OperationKind::Generate,
            Self::Explain { .. } => OperationKind::Explain,
            Self::DetectBugs { .. } => OperationKind::DetectBugs,
            Self::Refactor { .. } => OperationKind::Refactor,
            Self::Document { .. } => OperationKind::Document,
        }
    }

    #[must_use]
    pub fn matches(&self, kind: OperationKind) -> bool {
        self.kind() == kind
    }
}
