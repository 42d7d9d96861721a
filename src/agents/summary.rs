//! Summary agent: explains query results in natural language.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::agents::fallback::{fallback_summary, NO_RESULTS_SUMMARY};
use crate::agents::prompt::{build_summary_prompt, SUMMARY_SYSTEM_PROMPT};
use crate::agents::sql::SqlAgentOutput;
use crate::agents::Agent;
use crate::config::AgentSettings;
use crate::llm::{LlmClient, Message};

/// Output of the summary stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOutput {
    /// Non-empty explanation of the results.
    pub summary: String,
}

/// Summarizes SQL results. Never fails: LLM errors yield a fallback summary.
pub struct SummaryAgent {
    llm: Arc<dyn LlmClient>,
    settings: AgentSettings,
}

impl SummaryAgent {
    /// Creates a new summary agent.
    pub fn new(llm: Arc<dyn LlmClient>, settings: AgentSettings) -> Self {
        Self { llm, settings }
    }

    /// Summarizes `sql_output` for the user who asked `question`.
    pub async fn process(
        &self,
        sql_output: &SqlAgentOutput,
        question: &str,
        context: &[Message],
    ) -> SummaryOutput {
        if sql_output.rows.is_empty() {
            return SummaryOutput {
                summary: NO_RESULTS_SUMMARY.to_string(),
            };
        }

        let prompt = build_summary_prompt(
            question,
            &sql_output.sql_query,
            &sql_output.columns,
            &sql_output.rows,
            sql_output.row_count(),
        );

        let summary = match self.call_llm(&prompt, context).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Summary model returned an empty completion, using fallback");
                fallback_summary(sql_output)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    category = e.category(),
                    "Summary generation failed, using fallback"
                );
                fallback_summary(sql_output)
            }
        };

        SummaryOutput { summary }
    }
}

#[async_trait]
impl Agent for SummaryAgent {
    fn name(&self) -> &'static str {
        "summary_agent"
    }

    fn system_prompt(&self) -> &str {
        SUMMARY_SYSTEM_PROMPT
    }

    fn settings(&self) -> AgentSettings {
        self.settings
    }

    fn llm(&self) -> &dyn LlmClient {
        self.llm.as_ref()
    }
}
