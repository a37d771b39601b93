/// LLM client: the single point of entry for all model calls in Tailor.
///
/// ARCHITECTURAL RULE: No other module may call the model API directly.
/// Everything goes through the `ModelGateway` trait; `LlmClient` is the production
/// implementation against an OpenAI-compatible chat completions endpoint.
///
/// One request, one response. There is no retry loop here: a failed call is
/// classified and handed back, and the caller decides what to do with it.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmConfig;

pub mod prompts;
#[cfg(test)]
pub mod testing;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model API key is not configured")]
    NotConfigured,

    #[error("model returned empty content")]
    EmptyContent,

    #[error("model API rejected the credentials (status {status})")]
    Unauthorized { status: u16 },

    #[error("model API rate limit exceeded")]
    RateLimited,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// A fully built two-message instruction set: fixed system policy + dynamic user payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Executes exactly one round trip against the generative model and returns the raw
/// text content of the reply. Implementations must demand a JSON object reply.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    /// Text of the first choice, if the model produced any.
    fn text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Production gateway. Cheap to clone; holds a pooled HTTP client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ModelGateway for LlmClient {
    async fn complete(&self, request: &ModelRequest) -> Result<String, LlmError> {
        // Fail fast: no network call without a credential.
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let parsed: ChatResponse = response.json().await?;
        if let Some(usage) = &parsed.usage {
            debug!(
                "Model call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                self.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        parsed.text().ok_or(LlmError::EmptyContent)
    }
}

/// Maps a non-success HTTP status onto the gateway's outcome classes.
fn classify_failure(status: StatusCode, body: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!("Model API rejected credentials: {}", status);
            LlmError::Unauthorized {
                status: status.as_u16(),
            }
        }
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("Model API rate limited the request");
            LlmError::RateLimited
        }
        _ => {
            let message = serde_json::from_str::<ApiError>(body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.to_string());
            warn!("Model API returned {}: {}", status, message);
            LlmError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(str::to_string),
            model: "gpt-4o".to_string(),
            base_url: "http://127.0.0.1:9/v1/".to_string(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "  {\"key\": \"value\"}\n";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_network_call() {
        // Port 9 is unroutable; reaching the network would surface as Http, not NotConfigured.
        let client = LlmClient::new(&config(None)).unwrap();
        assert!(!client.is_configured());
        let request = ModelRequest {
            system: "system".to_string(),
            user: "user".to_string(),
            temperature: 0.3,
        };
        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured));
    }

    #[test]
    fn test_endpoint_joins_base_url_without_double_slash() {
        let client = LlmClient::new(&config(Some("sk-test"))).unwrap();
        assert_eq!(client.endpoint, "http://127.0.0.1:9/v1/chat/completions");
        assert_eq!(client.model(), "gpt-4o");
    }

    #[test]
    fn test_classify_auth_and_rate_limit() {
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, ""),
            LlmError::Unauthorized { status: 401 }
        ));
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, ""),
            LlmError::RateLimited
        ));
    }

    #[test]
    fn test_classify_other_status_extracts_api_message() {
        let body = r#"{"error": {"message": "model overloaded"}}"#;
        match classify_failure(StatusCode::SERVICE_UNAVAILABLE, body) {
            LlmError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "model overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_response_text_ignores_blank_content() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "   "}}], "usage": null}"#,
        )
        .unwrap();
        assert_eq!(response.text(), None);

        let response: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "{}"}}]}"#).unwrap();
        assert_eq!(response.text().as_deref(), Some("{}"));
    }
}
