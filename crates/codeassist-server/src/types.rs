//! HTTP request and response bodies

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::completion::{Bug, CompletionFields, CompletionPayload, CompletionRequest};
use crate::constants::{DEFAULT_DOC_STYLE, DEFAULT_LANGUAGE, TOKEN_TYPE_BEARER};

#[allow(clippy::unnecessary_wraps)]
fn default_language() -> Option<String> {
    Some(DEFAULT_LANGUAGE.to_string())
}

#[allow(clippy::unnecessary_wraps)]
fn default_style() -> Option<String> {
    Some(DEFAULT_DOC_STYLE.to_string())
}

/// Body of `POST /generate`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    #[serde(default = "default_language")]
    pub language: Option<String>,
    pub context: Option<String>,
}

/// Body of `POST /explain` and `POST /detect-bugs`
#[derive(Debug, Clone, Deserialize)]
pub struct CodeRequest {
    pub code: Option<String>,
    #[serde(default = "default_language")]
    pub language: Option<String>,
}

/// Body of `POST /refactor`
#[derive(Debug, Clone, Deserialize)]
pub struct RefactorRequest {
    pub code: Option<String>,
    #[serde(default = "default_language")]
    pub language: Option<String>,
    pub instructions: Option<String>,
}

/// Body of `POST /document`
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRequest {
    pub code: Option<String>,
    #[serde(default = "default_language")]
    pub language: Option<String>,
    #[serde(default = "default_style")]
    pub style: Option<String>,
}

impl From<GenerateRequest> for CompletionFields {
    fn from(body: GenerateRequest) -> Self {
        Self {
            prompt: body.prompt,
            language: body.language,
            context: body.context,
            ..Self::default()
        }
    }
}

impl From<CodeRequest> for CompletionFields {
    fn from(body: CodeRequest) -> Self {
        Self {
            code: body.code,
            language: body.language,
            ..Self::default()
        }
    }
}

impl From<RefactorRequest> for CompletionFields {
    fn from(body: RefactorRequest) -> Self {
        Self {
            code: body.code,
            language: body.language,
            instructions: body.instructions,
            ..Self::default()
        }
    }
}

impl From<DocumentRequest> for CompletionFields {
    fn from(body: DocumentRequest) -> Self {
        Self {
            code: body.code,
            language: body.language,
            style: body.style,
            ..Self::default()
        }
    }
}

/// Response of every assistant operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bugs: Option<Vec<Bug>>,
    pub language: String,
}

impl CodeResponse {
    #[must_use]
    pub fn from_payload(request: &CompletionRequest, payload: CompletionPayload) -> Self {
        let fields = request.fields();
        let language = request.language().to_string();
        let echoed_code = fields.code().map(ToString::to_string);

        let (code, explanation, bugs) = match payload {
            CompletionPayload::Generate { code, explanation }
            | CompletionPayload::Refactor { code, explanation } => {
                (Some(code), Some(explanation), None)
            }
            CompletionPayload::Explain { explanation } => (echoed_code, Some(explanation), None),
            CompletionPayload::DetectBugs { bugs } => (
                echoed_code,
                Some(format!("Found {} potential issue(s)", bugs.len())),
                Some(bugs),
            ),
            CompletionPayload::Document { documented_code } => (
                Some(documented_code),
                Some(format!(
                    "Documentation added using {} style",
                    fields.style().unwrap_or(DEFAULT_DOC_STYLE)
                )),
                None,
            ),
        };

        Self {
            success: true,
            code,
            explanation,
            bugs,
            language,
        }
    }
}

/// Body of `POST /login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "username")]
    pub subject: String,
    #[serde(default, alias = "password")]
    pub secret: String,
}

/// Response of `POST /login`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    #[must_use]
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
        }
    }
}

/// Response of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

/// Response of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub service: String,
    pub version: String,
    pub docs: String,
}

/// Response of `GET /cache/stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsResponse {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_clients: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_days: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miss_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheStatsResponse {
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            enabled: true,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            enabled: true,
            keys: Some(stats.total_keys),
            memory_used: stats
                .memory_human
                .or_else(|| stats.memory_bytes.map(|b| format!("{b}B"))),
            connected_clients: stats.connected_clients,
            uptime_days: stats.uptime_days,
            hit_count: Some(stats.hit_count),
            miss_count: Some(stats.miss_count),
            error: None,
        }
    }
}

/// Response of `POST /cache/clear`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub removed: u64,
}
