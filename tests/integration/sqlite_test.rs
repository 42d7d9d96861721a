//! SQLite collaborator tests against a seeded temp database.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use db_ask::agents::Orchestrator;
use db_ask::config::AgentsConfig;
use db_ask::db::sample::seed_sample_database;
use db_ask::db::{DatabaseClient, SqliteClient, Value, MAX_ROWS};
use db_ask::error::AskError;
use db_ask::llm::MockLlmClient;
use tempfile::TempDir;

/// Seeds the demo database in a fresh temp directory.
async fn seeded() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("company.db");
    assert!(seed_sample_database(&path).await.unwrap());
    (dir, path)
}

async fn open(path: &PathBuf) -> SqliteClient {
    SqliteClient::open(path, Duration::from_secs(5)).await.unwrap()
}

#[tokio::test]
async fn test_seed_is_skipped_for_existing_file() {
    let (_dir, path) = seeded().await;
    assert!(!seed_sample_database(&path).await.unwrap());
}

#[tokio::test]
async fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = SqliteClient::open(dir.path().join("missing.db"), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::Connection(_)));
    assert!(err.to_string().contains("--init-sample"));
}

#[tokio::test]
async fn test_introspect_sample_schema() {
    let (_dir, path) = seeded().await;
    let client = open(&path).await;

    let schema = client.introspect_schema().await.unwrap();
    let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["department", "usermaster", "UserSkillAndRatings"]);

    let usermaster = schema.table("USERMASTER").unwrap();
    assert_eq!(usermaster.primary_key, vec!["user_id".to_string()]);
    assert_eq!(schema.foreign_keys.len(), 2);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_schema_text() {
    let (_dir, path) = seeded().await;
    let client = open(&path).await;

    let text = client.schema_text().await.unwrap();

    assert!(text.starts_with("Tables and Columns:\n\n1) department\n"));
    assert!(text.contains("   - dept_id (INTEGER, PK)"));
    assert!(text.contains("   - full_name (TEXT, NOT NULL)"));
    assert!(text.contains("   - dept_id (INTEGER, FK -> department.dept_id)"));
    assert!(text.contains("3) UserSkillAndRatings"));
    assert!(text.contains("   - user_id (INTEGER, NOT NULL, FK -> usermaster.user_id)"));
}

#[tokio::test]
async fn test_execute_select() {
    let (_dir, path) = seeded().await;
    let client = open(&path).await;

    let result = client
        .execute_readonly("SELECT user_id, full_name, phone FROM usermaster ORDER BY user_id;")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["user_id", "full_name", "phone"]);
    assert_eq!(result.row_count(), 4);
    assert_eq!(
        result.rows[0],
        vec![
            Value::Int(1),
            Value::from("Alice Johnson"),
            Value::from("9876543210")
        ]
    );
}

#[tokio::test]
async fn test_execute_aggregate() {
    let (_dir, path) = seeded().await;
    let client = open(&path).await;

    let result = client
        .execute_readonly("SELECT AVG(rating) AS avg_rating FROM UserSkillAndRatings;")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["avg_rating"]);
    let average = result.rows[0][0].as_f64().unwrap();
    assert!((average - 30.0 / 7.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let (_dir, path) = seeded().await;
    let client = open(&path).await;

    let result = client
        .execute_readonly("SELECT dept_id, dept_name FROM department WHERE dept_id = 99;")
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.columns, vec!["dept_id", "dept_name"]);
}

#[tokio::test]
async fn test_rows_beyond_the_cap_are_counted() {
    let (_dir, path) = seeded().await;
    let client = open(&path).await;
    let total = MAX_ROWS + 500;

    let result = client
        .execute_readonly(&format!(
            "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < {total}) \
             SELECT x FROM n;"
        ))
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["x"]);
    assert_eq!(result.rows.len(), MAX_ROWS);
    assert_eq!(result.total_rows, total);
    assert!(result.was_truncated);
    assert_eq!(result.rows[MAX_ROWS - 1][0], Value::Int(MAX_ROWS as i64));
}

#[tokio::test]
async fn test_writes_are_refused() {
    let (_dir, path) = seeded().await;
    let client = open(&path).await;

    let err = client
        .execute_readonly("DELETE FROM department;")
        .await
        .unwrap_err();
    assert!(matches!(err, AskError::Execution(_)));

    let result = client
        .execute_readonly("SELECT COUNT(*) AS n FROM department;")
        .await
        .unwrap();
    assert_eq!(result.rows[0][0], Value::Int(3));
}

#[tokio::test]
async fn test_engine_error_is_execution_error() {
    let (_dir, path) = seeded().await;
    let client = open(&path).await;

    let err = client
        .execute_readonly("SELECT fullname FROM usermaster;")
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::Execution(_)));
    assert!(err.to_string().contains("fullname"));
}

#[tokio::test]
async fn test_pipeline_against_sqlite() {
    let (_dir, path) = seeded().await;
    let db = Arc::new(open(&path).await);
    let llm = Arc::new(MockLlmClient::new());
    let orchestrator = Orchestrator::new(llm, db, &AgentsConfig::default());

    let envelope = orchestrator.process("Show skill ratings").await;
    assert!(envelope.is_success(), "got {envelope:?}");
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["columns"], serde_json::json!(["full_name", "skill_name", "rating"]));
    assert_eq!(json["rows"].as_array().unwrap().len(), 7);

    let envelope = orchestrator.process("Count users per department").await;
    assert!(envelope.is_success(), "got {envelope:?}");
    assert!(envelope.summary().unwrap().contains("3 rows"));
}
