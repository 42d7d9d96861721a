//! Mock database clients for testing and `--mock-db`.
//!
//! Provides an in-memory collaborator with canned results keyed by SQL
//! patterns, plus one that fails every execution.

use super::{Column, DatabaseClient, ForeignKey, QueryResult, Schema, Table, Value};
use crate::error::{AskError, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A mock database client that returns predefined results.
///
/// Results are matched by case-insensitive substring against the executed SQL;
/// the first matching pattern wins. Unmatched statements return an empty result.
pub struct MockDatabaseClient {
    schema: Schema,
    results: Vec<(String, QueryResult)>,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self::with_schema(Schema::default())
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            results: Vec::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Registers the result returned for statements containing `pattern`.
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.results.push((pattern.into().to_lowercase(), result));
        self
    }

    /// Creates a mock with the demo schema and data.
    ///
    /// Patterns are checked most specific first: the per-department count,
    /// skill ratings, users (which may join departments), then departments.
    pub fn sample() -> Self {
        let users = QueryResult::with_data(
            vec![
                "user_id".to_string(),
                "full_name".to_string(),
                "email".to_string(),
                "dept_name".to_string(),
            ],
            vec![
                vec![
                    Value::Int(1),
                    Value::from("Alice Johnson"),
                    Value::from("alice@example.com"),
                    Value::from("Engineering"),
                ],
                vec![
                    Value::Int(2),
                    Value::from("Bob Sharma"),
                    Value::from("bob@example.com"),
                    Value::from("HR"),
                ],
                vec![
                    Value::Int(3),
                    Value::from("Charlie Singh"),
                    Value::from("charlie@example.com"),
                    Value::from("Engineering"),
                ],
                vec![
                    Value::Int(4),
                    Value::from("Deepa Patel"),
                    Value::from("deepa@example.com"),
                    Value::from("Finance"),
                ],
            ],
        )
        .with_execution_time(Duration::from_millis(1));

        let departments = QueryResult::with_data(
            vec!["dept_id".to_string(), "dept_name".to_string()],
            vec![
                vec![Value::Int(1), Value::from("Engineering")],
                vec![Value::Int(2), Value::from("HR")],
                vec![Value::Int(3), Value::from("Finance")],
            ],
        )
        .with_execution_time(Duration::from_millis(1));

        let user_counts = QueryResult::with_data(
            vec!["dept_name".to_string(), "user_count".to_string()],
            vec![
                vec![Value::from("Engineering"), Value::Int(2)],
                vec![Value::from("Finance"), Value::Int(1)],
                vec![Value::from("HR"), Value::Int(1)],
            ],
        )
        .with_execution_time(Duration::from_millis(1));

        let skills = QueryResult::with_data(
            vec![
                "full_name".to_string(),
                "skill_name".to_string(),
                "rating".to_string(),
            ],
            [
                ("Alice Johnson", "Python", 5),
                ("Alice Johnson", "SQL", 4),
                ("Bob Sharma", "Recruitment", 5),
                ("Charlie Singh", "Python", 3),
                ("Charlie Singh", "DevOps", 4),
                ("Deepa Patel", "Excel", 5),
                ("Deepa Patel", "SQL", 4),
            ]
            .into_iter()
            .map(|(name, skill, rating)| {
                vec![Value::from(name), Value::from(skill), Value::Int(rating)]
            })
            .collect(),
        )
        .with_execution_time(Duration::from_millis(1));

        Self::with_schema(sample_schema())
            .with_result("user_count", user_counts)
            .with_result("userskillandratings", skills)
            .with_result("usermaster", users)
            .with_result("department", departments)
    }

    /// Returns every statement passed to `execute_readonly`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_readonly(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        let lowered = sql.to_lowercase();
        let result = self
            .results
            .iter()
            .find(|(pattern, _)| lowered.contains(pattern.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_default();

        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A database client whose executions always fail.
pub struct FailingDatabaseClient {
    schema: Schema,
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client that reports `message` as the engine error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            schema: sample_schema(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_readonly(&self, _sql: &str) -> Result<QueryResult> {
        Err(AskError::execution(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// The demo schema shared by the mock collaborators.
fn sample_schema() -> Schema {
    Schema {
        tables: vec![
            Table::new("department")
                .column(Column::new("dept_id", "INTEGER"))
                .column(Column::new("dept_name", "TEXT").nullable(false))
                .primary_key(&["dept_id"]),
            Table::new("usermaster")
                .column(Column::new("user_id", "INTEGER"))
                .column(Column::new("full_name", "TEXT").nullable(false))
                .column(Column::new("email", "TEXT").nullable(false))
                .column(Column::new("phone", "TEXT"))
                .column(Column::new("dept_id", "INTEGER"))
                .primary_key(&["user_id"]),
            Table::new("UserSkillAndRatings")
                .column(Column::new("id", "INTEGER"))
                .column(Column::new("user_id", "INTEGER").nullable(false))
                .column(Column::new("skill_name", "TEXT").nullable(false))
                .column(Column::new("rating", "INTEGER").nullable(false))
                .primary_key(&["id"]),
        ],
        foreign_keys: vec![
            ForeignKey::new(
                "usermaster",
                vec!["dept_id".to_string()],
                "department",
                vec!["dept_id".to_string()],
            ),
            ForeignKey::new(
                "UserSkillAndRatings",
                vec!["user_id".to_string()],
                "usermaster",
                vec!["user_id".to_string()],
            ),
        ],
    }
}
