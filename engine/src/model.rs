//! Text-completion client
//!
//! One non-streaming request to the Anthropic Messages API per run. The
//! [`CompletionClient`] trait lets the engine run against a scripted model in
//! tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Anthropic API version header.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Long plans at 16k tokens take minutes to generate.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Errors from the completion client.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Network request failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    ApiResponse {
        status: u16,
        message: String,
        error_type: Option<String>,
    },

    /// Failed to parse API response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub prompt: String,
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub id: Option<String>,
    /// Concatenated `text` blocks.
    pub text: String,
    /// Concatenated `thinking` blocks.
    pub thinking: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

impl Completion {
    /// Text to decode: the answer text, or the thinking text when the model
    /// produced nothing else.
    pub fn response_text(&self) -> Option<&str> {
        if !self.text.trim().is_empty() {
            Some(&self.text)
        } else if !self.thinking.trim().is_empty() {
            Some(&self.thinking)
        } else {
            None
        }
    }

    pub fn truncated(&self) -> bool {
        self.stop_reason.as_deref() == Some("max_tokens")
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ModelError>;
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: AnthropicError,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "thinking")]
    Thinking { thinking: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: TokenUsage,
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    client: reqwest::Client,
    messages_url: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Creates a client with a custom HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            messages_url: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, ModelError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| ModelError::InvalidConfig("Invalid API key".to_string()))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }

    /// Builds the request body for the Messages API.
    fn build_request_body(request: &CompletionRequest) -> Value {
        json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "messages": [
                {"role": "user", "content": request.prompt}
            ]
        })
    }

    fn parse_response(body: &str) -> Result<Completion, ModelError> {
        let parsed: MessageResponse = serde_json::from_str(body)
            .map_err(|e| ModelError::Parse(format!("Failed to parse message response: {e}")))?;

        let mut completion = Completion {
            id: parsed.id,
            stop_reason: parsed.stop_reason,
            usage: parsed.usage,
            ..Completion::default()
        };
        for block in parsed.content {
            match block {
                ContentBlock::Text { text } => completion.text.push_str(&text),
                ContentBlock::Thinking { thinking } => completion.thinking.push_str(&thinking),
                ContentBlock::Other => {}
            }
        }
        Ok(completion)
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ModelError> {
        tracing::debug!(
            model = %request.model,
            prompt_chars = request.prompt.chars().count(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&self.messages_url)
            .headers(self.headers()?)
            .json(&Self::build_request_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(ModelError::ApiResponse {
                    status: status.as_u16(),
                    message: error_response.error.message,
                    error_type: Some(error_response.error.error_type),
                });
            }
            return Err(ModelError::ApiResponse {
                status: status.as_u16(),
                message: body,
                error_type: None,
            });
        }

        let completion = Self::parse_response(&body)?;
        tracing::info!(
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            stop_reason = completion.stop_reason.as_deref().unwrap_or("unknown"),
            "completion received"
        );
        Ok(completion)
    }
}
