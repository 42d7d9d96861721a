//! The question-answering pipeline.
//!
//! Two agents share one LLM client: the SQL agent turns a question into a
//! validated, executed query; the summary agent explains the rows. The
//! orchestrator sequences them and produces a `ResponseEnvelope`. A chart
//! suited to the rows is picked without the model, in `visualization`.

pub mod envelope;
pub mod fallback;
pub mod orchestrator;
pub mod prompt;
pub mod sql;
pub mod summary;
pub mod visualization;

pub use envelope::ResponseEnvelope;
pub use orchestrator::Orchestrator;
pub use sql::{SqlAgent, SqlAgentOutput};
pub use summary::{SummaryAgent, SummaryOutput};
pub use visualization::{recommend_chart, ChartRecommendation, ChartType};

use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

use crate::config::AgentSettings;
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient, Message};

/// Capability shared by every agent: a system prompt, generation settings and
/// access to the LLM.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Component name used in logs.
    fn name(&self) -> &'static str;

    /// The system prompt sent first on every call.
    fn system_prompt(&self) -> &str;

    /// Temperature and token limit for this agent.
    fn settings(&self) -> AgentSettings;

    /// The client used for completions.
    fn llm(&self) -> &dyn LlmClient;

    /// Sends `[system, ...context, user]` to the model.
    ///
    /// `context` is caller-owned prior conversation; the agent never stores it.
    async fn call_llm(&self, user_message: &str, context: &[Message]) -> Result<String> {
        let settings = self.settings();

        let mut messages = Vec::with_capacity(context.len() + 2);
        messages.push(Message::system(self.system_prompt()));
        messages.extend_from_slice(context);
        messages.push(Message::user(user_message));

        let request = CompletionRequest::new(messages)
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens)
            .with_component(self.name());

        let start = Instant::now();
        let result = self.llm().complete(&request).await;

        debug!(
            component = self.name(),
            model = self.llm().model(),
            prompt_chars = user_message.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "LLM call finished"
        );

        result
    }
}
