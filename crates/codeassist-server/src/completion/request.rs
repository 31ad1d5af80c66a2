//! Operation kinds and their input fields

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::{ValidationError, validate_field_length, validate_required};

/// The five operations the assistant can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Generate,
    Explain,
    DetectBugs,
    Refactor,
    Document,
}

impl OperationKind {
    pub const ALL: [Self; 5] = [
        Self::Generate,
        Self::Explain,
        Self::DetectBugs,
        Self::Refactor,
        Self::Document,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Explain => "explain",
            Self::DetectBugs => "detect-bugs",
            Self::Refactor => "refactor",
            Self::Document => "document",
        }
    }

    /// Human-readable label used in error details
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Generate => "Code generation",
            Self::Explain => "Code explanation",
            Self::DetectBugs => "Bug detection",
            Self::Refactor => "Code refactoring",
            Self::Document => "Documentation generation",
        }
    }

    /// Field that must be present and non-blank for this operation
    const fn primary_field(self) -> FieldName {
        match self {
            Self::Generate => FieldName::Prompt,
            Self::Explain | Self::DetectBugs | Self::Refactor | Self::Document => FieldName::Code,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown operation: {s}"))
    }
}

/// Semantic input fields, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldName {
    Prompt,
    Code,
    Language,
    Context,
    Instructions,
    Style,
}

impl FieldName {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Code => "code",
            Self::Language => "language",
            Self::Context => "context",
            Self::Instructions => "instructions",
            Self::Style => "style",
        }
    }
}

/// Raw operation inputs as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionFields {
    pub prompt: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
    pub context: Option<String>,
    pub instructions: Option<String>,
    pub style: Option<String>,
}

impl CompletionFields {
    /// Apply the normalization rules: every field is trimmed, only `language`
    /// is lower-cased, absent fields stay absent.
    #[must_use]
    pub fn normalize(self) -> NormalizedFields {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());

        NormalizedFields {
            prompt: trim(self.prompt),
            code: trim(self.code),
            language: self.language.map(|v| v.trim().to_lowercase()),
            context: trim(self.context),
            instructions: trim(self.instructions),
            style: trim(self.style),
        }
    }
}

/// Fields after normalization. Only constructed through [`CompletionFields::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFields {
    prompt: Option<String>,
    code: Option<String>,
    language: Option<String>,
    context: Option<String>,
    instructions: Option<String>,
    style: Option<String>,
}

impl NormalizedFields {
    #[must_use]
    pub fn get(&self, name: FieldName) -> Option<&str> {
        match name {
            FieldName::Prompt => self.prompt.as_deref(),
            FieldName::Code => self.code.as_deref(),
            FieldName::Language => self.language.as_deref(),
            FieldName::Context => self.context.as_deref(),
            FieldName::Instructions => self.instructions.as_deref(),
            FieldName::Style => self.style.as_deref(),
        }
    }

    /// Present fields in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &str)> {
        [
            FieldName::Prompt,
            FieldName::Code,
            FieldName::Language,
            FieldName::Context,
            FieldName::Instructions,
            FieldName::Style,
        ]
        .into_iter()
        .filter_map(|name| self.get(name).map(|value| (name, value)))
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    #[must_use]
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }
}

/// A validated, normalized request for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    kind: OperationKind,
    fields: NormalizedFields,
}

impl CompletionRequest {
    /// Normalize and validate the fields for `kind`.
    pub fn new(kind: OperationKind, fields: CompletionFields) -> Result<Self, ValidationError> {
        let fields = fields.normalize();

        let primary = kind.primary_field();
        validate_required(primary, fields.get(primary))?;
        for (name, value) in fields.iter() {
            validate_field_length(name, value)?;
        }

        Ok(Self { kind, fields })
    }

    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    #[must_use]
    pub const fn fields(&self) -> &NormalizedFields {
        &self.fields
    }

    /// Language label for responses; falls back to an empty string when absent
    #[must_use]
    pub fn language(&self) -> &str {
        self.fields.language().unwrap_or_default()
    }
}
