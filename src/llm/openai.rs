//! OpenAI-compatible chat completion transport.
//!
//! Speaks the `/chat/completions` protocol shared by OpenRouter, OpenAI and
//! DeepSeek. Each call is a single attempt; failures are classified as
//! transient or permanent for the retry layer.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use crate::error::{AskError, Result};
use crate::llm::types::{CompletionRequest, Message};
use crate::llm::ChatTransport;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Model id (e.g., "gpt-4o-mini").
    pub model: String,
    /// API base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Additional headers sent with every request.
    pub extra_headers: Vec<(String, String)>,
}

impl OpenAiCompatConfig {
    /// Creates a new config with the given key, model and base URL.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            extra_headers: Vec::new(),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Adds a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }
}

/// Single-attempt client for OpenAI-compatible chat completion APIs.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    config: OpenAiCompatConfig,
    endpoint: Url,
    client: Client,
}

impl OpenAiCompatClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: OpenAiCompatConfig) -> Result<Self> {
        let endpoint = completions_url(&config.base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AskError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            endpoint,
            client,
        })
    }
}

#[async_trait]
impl ChatTransport for OpenAiCompatClient {
    async fn send_once(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .json(&body);
        for (name, value) in &self.config.extra_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let start = Instant::now();
        let response = builder.send().await.map_err(map_request_error)?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AskError::transient_api(format!("Failed to read response: {e}")))?;

        debug!(
            model = %self.config.model,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion response"
        );

        if !status.is_success() {
            return Err(parse_error(status, &text));
        }

        parse_completion(&text)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    /// The full chat completions URL.
    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

/// Builds `<base>/chat/completions`, validating the base URL.
fn completions_url(base_url: &str) -> Result<Url> {
    let base = Url::parse(base_url)
        .map_err(|e| AskError::config(format!("Invalid LLM base URL '{base_url}': {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(AskError::config(format!(
            "LLM base URL must use http or https: {base_url}"
        )));
    }

    let joined = format!("{}/chat/completions", base.as_str().trim_end_matches('/'));
    Url::parse(&joined)
        .map_err(|e| AskError::config(format!("Invalid LLM base URL '{base_url}': {e}")))
}

/// Classifies a transport-level failure.
fn map_request_error(error: reqwest::Error) -> AskError {
    if error.is_timeout() {
        AskError::transient_api("Request timed out.")
    } else if error.is_connect() {
        AskError::transient_api(format!("Failed to connect to the LLM API: {error}"))
    } else {
        AskError::permanent_api(format!("Request failed: {error}"))
    }
}

/// Classifies a non-success HTTP response.
fn parse_error(status: StatusCode, body: &str) -> AskError {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().chars().take(200).collect());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AskError::permanent_api(format!(
            "Authentication failed ({status}). Check your API key. {detail}"
        )),
        StatusCode::TOO_MANY_REQUESTS => {
            AskError::transient_api(format!("Rate limited ({status}). {detail}"))
        }
        s if s.is_server_error() => {
            AskError::transient_api(format!("LLM API error ({status}): {detail}"))
        }
        _ => AskError::permanent_api(format!("LLM API error ({status}): {detail}")),
    }
}

/// Extracts the first choice's message content.
fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AskError::permanent_api(format!("Failed to parse response: {e}")))?;

    response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AskError::permanent_api("Response contained no choices"))?
        .message
        .content
        .ok_or_else(|| AskError::permanent_api("Response message had no content"))
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
