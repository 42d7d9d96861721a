//! LLM integration for db-ask.
//!
//! `ChatTransport` sends one request to one endpoint. `ResilientClient` wraps a
//! transport with the retry policy and is what agents see, through `LlmClient`.

pub mod factory;
pub mod mock;
pub mod openai;
pub mod parser;
pub mod resilient;
pub mod retry;
pub mod types;

pub use factory::create_client;
pub use mock::MockLlmClient;
pub use openai::{OpenAiCompatClient, OpenAiCompatConfig};
pub use parser::clean_sql_response;
pub use resilient::ResilientClient;
pub use retry::RetryPolicy;
pub use types::{CompletionRequest, Conversation, Message, Role};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) so one client serves
/// concurrent requests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion, returning the raw response text.
    ///
    /// Failures are `TransientApi` or `PermanentApi`; an empty string is
    /// never used to signal failure.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Returns the model id requests are sent to.
    fn model(&self) -> &str;
}

/// A single-attempt sender for chat completions.
///
/// Must classify every failure as transient or permanent; retrying is the
/// caller's job.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends `request` once.
    async fn send_once(&self, request: &CompletionRequest) -> Result<String>;

    /// Returns the model id this transport targets.
    fn model(&self) -> &str;

    /// Returns the URL requests are sent to.
    fn endpoint(&self) -> &str;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenRouter (OpenAI-compatible gateway)
    #[default]
    OpenRouter,
    /// OpenAI
    OpenAi,
    /// DeepSeek
    DeepSeek,
    /// Mock client for testing (no API key required)
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Mock => "mock",
        }
    }

    /// Returns the default API base URL.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::DeepSeek => "https://api.deepseek.com",
            Self::Mock => "mock://local",
        }
    }

    /// Returns the default model id.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenRouter => "meta-llama/llama-3.1-8b-instruct:free",
            Self::OpenAi => "gpt-4o-mini",
            Self::DeepSeek => "deepseek-chat",
            Self::Mock => "mock",
        }
    }

    /// Returns the environment variable holding the API key, if one is needed.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenRouter => Some("OPENROUTER_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::DeepSeek => Some("DEEPSEEK_API_KEY"),
            Self::Mock => None,
        }
    }

    /// Returns the environment variable that overrides the model id.
    pub fn model_env(&self) -> &'static str {
        match self {
            Self::OpenRouter => "OPENROUTER_MODEL",
            Self::OpenAi => "OPENAI_MODEL",
            Self::DeepSeek => "DEEPSEEK_MODEL",
            Self::Mock => "MOCK_MODEL",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openrouter" => Ok(Self::OpenRouter),
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
