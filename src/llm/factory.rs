//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::llm::{
    ChatTransport, LlmClient, LlmProvider, MockLlmClient, OpenAiCompatClient, OpenAiCompatConfig,
    ResilientClient, RetryPolicy,
};
use crate::observability::EventSink;

/// Referer reported to OpenRouter for attribution.
const OPENROUTER_REFERER: &str = "http://localhost";

/// Application title reported to OpenRouter.
const OPENROUTER_TITLE: &str = "db-ask";

/// Creates the retrying LLM client described by `config`.
///
/// The API key is resolved in order:
/// 1. `[llm].api_key` in the config
/// 2. The provider's environment variable (`OPENROUTER_API_KEY`, `OPENAI_API_KEY`, `DEEPSEEK_API_KEY`)
///
/// A missing or placeholder key is a configuration error.
pub fn create_client(config: &LlmConfig, sink: Arc<dyn EventSink>) -> Result<Arc<dyn LlmClient>> {
    let policy = RetryPolicy::new(config.max_attempts, config.retry_base_delay());

    match config.provider {
        LlmProvider::Mock => Ok(Arc::new(
            ResilientClient::new(MockLlmClient::new())
                .with_policy(policy)
                .with_sink(sink),
        )),
        provider => {
            let api_key = config.resolve_api_key()?.unwrap_or_default();
            let mut transport_config =
                OpenAiCompatConfig::new(api_key, config.resolve_model(), config.resolve_base_url())
                    .with_timeout(config.timeout_secs);

            if provider == LlmProvider::OpenRouter {
                transport_config = transport_config
                    .with_header("HTTP-Referer", OPENROUTER_REFERER)
                    .with_header("X-Title", OPENROUTER_TITLE);
            }

            let transport = OpenAiCompatClient::new(transport_config)?;
            tracing::info!(
                provider = %provider,
                model = %transport.model(),
                endpoint = %transport.endpoint(),
                "LLM client ready"
            );

            Ok(Arc::new(
                ResilientClient::new(transport)
                    .with_policy(policy)
                    .with_sink(sink),
            ))
        }
    }
}
