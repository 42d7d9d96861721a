//! SQL agent: question to validated, executed query.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::agents::prompt::{build_sql_prompt, SQL_SYSTEM_PROMPT};
use crate::agents::Agent;
use crate::config::AgentSettings;
use crate::db::{DatabaseClient, QueryResult, Row};
use crate::error::Result;
use crate::llm::{clean_sql_response, LlmClient, Message};
use crate::safety::validate_select;

/// Output of a successful SQL stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlAgentOutput {
    /// The validated statement that was executed.
    pub sql_query: String,
    /// Result column names, in order.
    pub columns: Vec<String>,
    /// Result rows, each aligned with `columns`.
    pub rows: Vec<Row>,
    /// Rows the statement produced, including any dropped by the row cap.
    #[serde(default)]
    pub total_rows: usize,
}

impl SqlAgentOutput {
    /// Combines an executed statement with its result.
    pub fn new(sql_query: impl Into<String>, result: QueryResult) -> Self {
        Self {
            sql_query: sql_query.into(),
            columns: result.columns,
            rows: result.rows,
            total_rows: result.total_rows,
        }
    }

    /// Returns the number of rows the statement produced.
    ///
    /// This can exceed `rows.len()` when the database capped the result.
    pub fn row_count(&self) -> usize {
        self.total_rows.max(self.rows.len())
    }

    /// Returns true when `rows` holds only part of the result.
    pub fn is_truncated(&self) -> bool {
        self.row_count() > self.rows.len()
    }
}

/// Generates SQL with the LLM, cleans and validates it, then executes it.
pub struct SqlAgent {
    llm: Arc<dyn LlmClient>,
    db: Arc<dyn DatabaseClient>,
    settings: AgentSettings,
}

impl SqlAgent {
    /// Creates a new SQL agent.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        db: Arc<dyn DatabaseClient>,
        settings: AgentSettings,
    ) -> Self {
        Self { llm, db, settings }
    }

    /// Answers `question` against the database described by `schema_text`.
    ///
    /// Errors end the pipeline:
    /// - `TransientApi` / `PermanentApi` when the model cannot be reached
    /// - `Generation` when no statement can be extracted
    /// - `UnsafeQuery` when the statement violates the read-only policy (never executed)
    /// - `Execution` when the database rejects the statement (not retried)
    pub async fn process(
        &self,
        question: &str,
        schema_text: &str,
        context: &[Message],
    ) -> Result<SqlAgentOutput> {
        let prompt = build_sql_prompt(schema_text, question);
        let response = self.call_llm(&prompt, context).await?;
        debug!(response = %response, "Raw SQL response");

        let sql = clean_sql_response(&response)?;
        validate_select(&sql)?;

        let result = self.db.execute_readonly(&sql).await?;
        info!(
            sql = %sql,
            rows = result.row_count(),
            total_rows = result.total_rows,
            duration_ms = result.execution_time.as_millis() as u64,
            "SQL executed"
        );

        Ok(SqlAgentOutput::new(sql, result))
    }
}

#[async_trait]
impl Agent for SqlAgent {
    fn name(&self) -> &'static str {
        "sql_agent"
    }

    fn system_prompt(&self) -> &str {
        SQL_SYSTEM_PROMPT
    }

    fn settings(&self) -> AgentSettings {
        self.settings
    }

    fn llm(&self) -> &dyn LlmClient {
        self.llm.as_ref()
    }
}
