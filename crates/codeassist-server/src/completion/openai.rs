//! OpenAI-compatible chat-completions gateway

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::gateway::{CompletionGateway, UpstreamError};
use super::{CompletionPayload, CompletionRequest, prompt};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for [`OpenAiGateway`]
#[derive(Clone)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub base_url: Url,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("valid default base URL"),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Gateway speaking the `/chat/completions` protocol
#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    client: reqwest::Client,
    endpoint: Url,
    config: GatewayConfig,
}

impl OpenAiGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        let mut endpoint = config.base_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|()| UpstreamError::Request("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["chat", "completions"]);

        info!(model = %config.model, endpoint = %endpoint, "Completion gateway initialized");

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    fn map_send_error(&self, err: &reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.config.timeout)
        } else {
            UpstreamError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionPayload, UpstreamError> {
        let content = prompt::render(request);
        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: &content,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(operation = %request.kind(), prompt_length = content.len(), "Calling completion gateway");

        let mut builder = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::MalformedResponse(e.to_string()))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| UpstreamError::MalformedResponse("no choices in response".to_string()))?;

        Ok(prompt::parse_reply(request, &reply))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::completion::{CompletionFields, OperationKind};

    fn gateway_for(server: &MockServer, timeout: Duration) -> OpenAiGateway {
        OpenAiGateway::new(GatewayConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Url::parse(&format!("{}/v1", server.uri())).unwrap(),
            timeout,
            ..Default::default()
        })
        .unwrap()
    }

    fn explain_request() -> CompletionRequest {
        CompletionRequest::new(
            OperationKind::Explain,
            CompletionFields {
                code: Some("print(1)".to_string()),
                language: Some("python".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn chat_reply(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    #[test]
    fn test_gateway_config_debug_redacts_key() {
        let config = GatewayConfig {
            api_key: Some("sk-very-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-very-secret"));
    }

    #[tokio::test]
    async fn test_complete_posts_chat_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-4" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Prints one.")))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server, Duration::from_secs(5));
        let payload = gateway.complete(&explain_request()).await.unwrap();

        assert_eq!(
            payload,
            CompletionPayload::Explain {
                explanation: "Prints one.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_complete_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server, Duration::from_secs(5));
        let err = gateway.complete(&explain_request()).await.unwrap_err();

        assert!(matches!(err, UpstreamError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let gateway = gateway_for(&server, Duration::from_secs(5));
        let err = gateway.complete(&explain_request()).await.unwrap_err();

        assert!(matches!(err, UpstreamError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_complete_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_reply("late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let gateway = gateway_for(&server, Duration::from_millis(100));
        let err = gateway.complete(&explain_request()).await.unwrap_err();

        assert!(err.is_timeout());
    }
}
