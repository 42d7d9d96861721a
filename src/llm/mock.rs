//! Mock LLM client for testing and `--llm mock`.
//!
//! Provides deterministic responses based on input patterns, plus a queue of
//! scripted results for exercising retry and failure paths.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::Result;
use crate::llm::types::CompletionRequest;
use crate::llm::{ChatTransport, LlmClient};

/// Endpoint reported in progress events for the mock transport.
pub const MOCK_ENDPOINT: &str = "mock://local";

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Scripted results are consumed first, in order. After that, custom pattern
/// mappings are checked against the last user message, then built-in defaults
/// for the demo schema.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Results returned before any pattern matching.
    scripted: Mutex<VecDeque<Result<String>>>,
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Every request received, in order.
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a result to be returned by the next unanswered call.
    pub fn with_scripted(self, result: Result<String>) -> Self {
        if let Ok(mut scripted) = self.scripted.lock() {
            scripted.push_back(result);
        }
        self
    }

    /// Adds a custom response mapping.
    ///
    /// When the last user message contains `pattern`, the mock returns `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into().to_lowercase(), response.into()));
        self
    }

    /// Returns how many calls were made.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Returns a copy of every request received.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn respond(&self, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(result) = self.scripted.lock().ok().and_then(|mut s| s.pop_front()) {
            return result;
        }

        let input = request.last_user_content().unwrap_or_default();
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(pattern.as_str()) {
                return Ok(response.clone());
            }
        }

        if input_lower.contains("query results:") {
            return Ok(Self::mock_summary(input));
        }

        Ok(Self::mock_sql(&Self::extract_question(&input_lower)).to_string())
    }

    /// Picks the question out of an SQL generation prompt.
    fn extract_question(input_lower: &str) -> String {
        input_lower
            .lines()
            .find_map(|line| line.strip_prefix("user request:"))
            .unwrap_or(input_lower)
            .trim()
            .to_string()
    }

    fn mock_sql(question: &str) -> &'static str {
        if question.contains("skill") || question.contains("rating") {
            return "```sql\nSELECT u.full_name, s.skill_name, s.rating\nFROM UserSkillAndRatings s\nJOIN usermaster u ON s.user_id = u.user_id;\n```";
        }

        if question.contains("count") && question.contains("department") {
            return "SELECT d.dept_name, COUNT(u.user_id) AS user_count FROM department d LEFT JOIN usermaster u ON u.dept_id = d.dept_id GROUP BY d.dept_name;";
        }

        if question.contains("user") || question.contains("employee") {
            return "```sql\nSELECT u.user_id, u.full_name, u.email, d.dept_name\nFROM usermaster u\nJOIN department d ON u.dept_id = d.dept_id;\n```";
        }

        if question.contains("department") {
            return "SELECT dept_id, dept_name FROM department;";
        }

        "Here is the query:\nSELECT name FROM sqlite_master WHERE type = 'table';"
    }

    fn mock_summary(input: &str) -> String {
        let rows = input
            .lines()
            .find_map(|line| line.trim().strip_prefix("Total rows:"))
            .map(str::trim)
            .unwrap_or("some");
        format!("The query returned {rows} rows matching your question.")
    }
}

#[async_trait]
impl ChatTransport for MockLlmClient {
    async fn send_once(&self, request: &CompletionRequest) -> Result<String> {
        self.respond(request)
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn endpoint(&self) -> &str {
        MOCK_ENDPOINT
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.respond(request)
    }

    fn model(&self) -> &str {
        "mock"
    }
}
