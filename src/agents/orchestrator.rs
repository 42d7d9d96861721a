//! Orchestrator: runs the SQL and summary stages for one question.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::agents::envelope::ResponseEnvelope;
use crate::agents::sql::SqlAgent;
use crate::agents::summary::SummaryAgent;
use crate::config::{AgentsConfig, Config};
use crate::db::DatabaseClient;
use crate::error::{AskError, Result};
use crate::llm::{create_client, LlmClient, Message};
use crate::observability::EventSink;

/// Message returned for a blank question.
pub const EMPTY_QUESTION_MESSAGE: &str = "Please ask a question about the database.";

/// Sequences schema lookup, SQL generation and summarization.
///
/// Holds only shared handles and immutable settings; one instance serves
/// concurrent requests.
pub struct Orchestrator {
    db: Arc<dyn DatabaseClient>,
    sql_agent: SqlAgent,
    summary_agent: SummaryAgent,
}

impl Orchestrator {
    /// Creates an orchestrator whose agents share `llm`.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        db: Arc<dyn DatabaseClient>,
        agents: &AgentsConfig,
    ) -> Self {
        Self {
            sql_agent: SqlAgent::new(llm.clone(), db.clone(), agents.sql),
            summary_agent: SummaryAgent::new(llm, agents.summary),
            db,
        }
    }

    /// Validates `config`, builds the LLM client and wires the agents.
    ///
    /// Missing credentials or invalid settings are returned as `Config` errors
    /// before any agent exists.
    pub fn from_config(
        config: &Config,
        db: Arc<dyn DatabaseClient>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;
        let llm = create_client(&config.llm, sink)?;
        Ok(Self::new(llm, db, &config.agents))
    }

    /// Answers a single question with no conversation context.
    pub async fn process(&self, question: &str) -> ResponseEnvelope {
        self.process_with_context(question, &[]).await
    }

    /// Answers a question, giving both agents the prior conversation.
    pub async fn process_with_context(
        &self,
        question: &str,
        context: &[Message],
    ) -> ResponseEnvelope {
        let question = question.trim();
        if question.is_empty() {
            return ResponseEnvelope::failure(EMPTY_QUESTION_MESSAGE);
        }

        let start = Instant::now();

        let schema_text = match self.db.schema_text().await {
            Ok(text) => text,
            Err(e) => return Self::fail("schema", e),
        };

        let sql_output = match self
            .sql_agent
            .process(question, &schema_text, context)
            .await
        {
            Ok(output) => output,
            Err(e) => return Self::fail("sql", e),
        };

        let summary = self
            .summary_agent
            .process(&sql_output, question, context)
            .await;

        info!(
            rows = sql_output.row_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Question answered"
        );

        ResponseEnvelope::success(sql_output, summary)
    }

    fn fail(stage: &'static str, error: AskError) -> ResponseEnvelope {
        warn!(
            stage,
            category = error.category(),
            error = %error,
            "Pipeline stopped"
        );
        ResponseEnvelope::failure(error.user_message())
    }
}
