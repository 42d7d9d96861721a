//! End-to-end pipeline tests with in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use db_ask::agents::{ChartType, Orchestrator, ResponseEnvelope};
use db_ask::config::AgentsConfig;
use db_ask::db::{FailingDatabaseClient, MockDatabaseClient, Value};
use db_ask::error::AskError;
use db_ask::llm::{Conversation, MockLlmClient, ResilientClient, RetryPolicy, Role};
use db_ask::observability::{Outcome, RecordingEventSink};
use pretty_assertions::assert_eq;

fn orchestrator(llm: Arc<MockLlmClient>, db: Arc<MockDatabaseClient>) -> Orchestrator {
    Orchestrator::new(llm, db, &AgentsConfig::default())
}

#[tokio::test]
async fn test_users_with_departments() {
    let llm = Arc::new(MockLlmClient::new());
    let db = Arc::new(MockDatabaseClient::sample());

    let envelope = orchestrator(llm.clone(), db.clone())
        .process("Show me all users with their department names")
        .await;

    let ResponseEnvelope::Success {
        sql_query,
        columns,
        rows,
        summary,
    } = &envelope
    else {
        panic!("expected success, got {envelope:?}");
    };

    assert!(sql_query.starts_with("SELECT u.user_id"));
    assert!(sql_query.contains("JOIN department"));
    assert!(sql_query.ends_with(';'));
    assert!(!sql_query.contains("```"));
    assert_eq!(columns, &vec!["user_id", "full_name", "email", "dept_name"]);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0][1], Value::from("Alice Johnson"));
    assert_eq!(summary, "The query returned 4 rows matching your question.");

    assert_eq!(db.executed(), vec![sql_query.clone()]);
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_drop_table_is_blocked_before_execution() {
    let llm = Arc::new(MockLlmClient::new().with_scripted(Ok("DROP TABLE usermaster;".to_string())));
    let db = Arc::new(MockDatabaseClient::sample());

    let envelope = orchestrator(llm.clone(), db.clone())
        .process("Remove the users table")
        .await;

    assert_eq!(
        envelope,
        ResponseEnvelope::failure(AskError::unsafe_query("DROP").user_message())
    );
    assert!(db.executed().is_empty());
    // The summary stage never ran.
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_fenced_select_one() {
    let llm = Arc::new(
        MockLlmClient::new().with_scripted(Ok("```sql\nSELECT 1;\n```".to_string())),
    );
    let db = Arc::new(MockDatabaseClient::sample());

    let envelope = orchestrator(llm, db.clone()).process("Give me one").await;

    assert!(envelope.is_success());
    assert_eq!(envelope.sql_query(), Some("SELECT 1;"));
    assert_eq!(db.executed(), vec!["SELECT 1;".to_string()]);
}

#[tokio::test]
async fn test_execution_failure_skips_summary() {
    let llm = Arc::new(MockLlmClient::new());
    let db = Arc::new(FailingDatabaseClient::new("no such column: fullname"));
    let orchestrator = Orchestrator::new(llm.clone(), db, &AgentsConfig::default());

    let envelope = orchestrator.process("List all departments").await;

    let error = envelope.error().expect("failure envelope");
    assert!(error.contains("failed to execute"));
    assert!(!error.contains("fullname"));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_summary_outage_falls_back_after_retries() {
    let sql = "SELECT u.user_id, u.full_name FROM usermaster u;";
    let transport = MockLlmClient::new()
        .with_scripted(Ok(sql.to_string()))
        .with_scripted(Err(AskError::transient_api("HTTP 503")))
        .with_scripted(Err(AskError::transient_api("HTTP 503")))
        .with_scripted(Err(AskError::transient_api("HTTP 503")));
    let sink = Arc::new(RecordingEventSink::new());
    let llm = Arc::new(
        ResilientClient::new(transport)
            .with_policy(RetryPolicy::new(3, Duration::from_millis(1)))
            .with_sink(sink.clone()),
    );
    let orchestrator = Orchestrator::new(
        llm.clone(),
        Arc::new(MockDatabaseClient::sample()),
        &AgentsConfig::default(),
    );

    let envelope = orchestrator.process("List all users").await;

    assert!(envelope.is_success());
    let summary = envelope.summary().unwrap();
    assert!(summary.contains("4 rows"), "summary was {summary:?}");
    assert_eq!(llm.transport().call_count(), 4);
    assert_eq!(
        sink.retry_delays(),
        vec![Duration::from_millis(1), Duration::from_millis(2)]
    );

    let components: Vec<String> = sink
        .events()
        .into_iter()
        .filter(|event| event.outcome == Outcome::Started)
        .map(|event| event.component)
        .collect();
    assert_eq!(
        components,
        vec!["sql_agent", "summary_agent", "summary_agent", "summary_agent"]
    );
}

#[tokio::test]
async fn test_permanent_sql_failure_is_not_retried() {
    let transport = MockLlmClient::new().with_scripted(Err(AskError::permanent_api("HTTP 401")));
    let llm = Arc::new(
        ResilientClient::new(transport).with_policy(RetryPolicy::new(3, Duration::from_millis(1))),
    );
    let orchestrator = Orchestrator::new(
        llm.clone(),
        Arc::new(MockDatabaseClient::sample()),
        &AgentsConfig::default(),
    );

    let envelope = orchestrator.process("List all users").await;

    assert!(!envelope.is_success());
    assert!(envelope.error().unwrap().contains("API key"));
    assert_eq!(llm.transport().call_count(), 1);
}

#[tokio::test]
async fn test_empty_result_gets_fixed_summary() {
    let llm = Arc::new(MockLlmClient::new().with_scripted(Ok(
        "SELECT name FROM sqlite_master WHERE type = 'view';".to_string(),
    )));
    let db = Arc::new(MockDatabaseClient::sample());

    let envelope = orchestrator(llm.clone(), db).process("Which views exist?").await;

    let ResponseEnvelope::Success { rows, summary, .. } = &envelope else {
        panic!("expected success, got {envelope:?}");
    };
    assert!(rows.is_empty());
    assert!(summary.starts_with("No results were found"));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_departments_and_skills_from_sample() {
    let llm = Arc::new(MockLlmClient::new());
    let orchestrator = orchestrator(llm, Arc::new(MockDatabaseClient::sample()));

    let departments = orchestrator.process("List all departments").await;
    let ResponseEnvelope::Success { columns, rows, .. } = &departments else {
        panic!("expected success, got {departments:?}");
    };
    assert_eq!(columns, &vec!["dept_id", "dept_name"]);
    assert_eq!(rows.len(), 3);

    let skills = orchestrator.process("Show skill ratings").await;
    let ResponseEnvelope::Success { columns, rows, .. } = &skills else {
        panic!("expected success, got {skills:?}");
    };
    assert_eq!(columns, &vec!["full_name", "skill_name", "rating"]);
    assert_eq!(rows.len(), 7);
    assert_eq!(skills.chart().unwrap().chart_type, ChartType::Bar);
}

#[tokio::test]
async fn test_user_counts_recommend_a_pie_chart() {
    let llm = Arc::new(MockLlmClient::new());
    let envelope = orchestrator(llm, Arc::new(MockDatabaseClient::sample()))
        .process("Count users per department")
        .await;

    assert!(envelope.summary().unwrap().contains("3 rows"));
    let chart = envelope.chart().expect("rows were returned");
    assert_eq!(chart.chart_type, ChartType::Pie);
    assert_eq!(chart.recommendation, "Pie chart showing distribution of 3 segments.");
}

#[tokio::test]
async fn test_conversation_context_reaches_both_agents() {
    let llm = Arc::new(MockLlmClient::new());
    let orchestrator = orchestrator(llm.clone(), Arc::new(MockDatabaseClient::sample()));

    let mut conversation = Conversation::new();
    conversation.record_turn("How many departments?", "SELECT COUNT(*) FROM department;");

    let envelope = orchestrator
        .process_with_context("And the users?", conversation.messages())
        .await;
    assert!(envelope.is_success());

    for request in llm.requests() {
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(request.messages[1].content, "How many departments?");
    }
}

#[tokio::test]
async fn test_agents_use_their_own_settings() {
    let llm = Arc::new(MockLlmClient::new());
    let orchestrator = orchestrator(llm.clone(), Arc::new(MockDatabaseClient::sample()));

    orchestrator.process("Show all employees").await;

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].temperature, 0.3);
    assert_eq!(requests[1].temperature, 0.7);
    assert!(requests[0].messages[1].content.contains("1) department"));
    assert!(requests[1].messages[1].content.contains("Total rows: 4"));
}

#[tokio::test]
async fn test_concurrent_questions_share_one_orchestrator() {
    let llm = Arc::new(MockLlmClient::new());
    let orchestrator = Arc::new(orchestrator(llm.clone(), Arc::new(MockDatabaseClient::sample())));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.process("Show all users").await })
        })
        .collect();

    for envelope in futures::future::join_all(handles).await {
        assert!(envelope.unwrap().is_success());
    }
    assert_eq!(llm.call_count(), 8);
}

#[tokio::test]
async fn test_envelope_json() {
    let llm = Arc::new(MockLlmClient::new());
    let envelope = orchestrator(llm, Arc::new(MockDatabaseClient::sample()))
        .process("Show all users")
        .await;

    let json: serde_json::Value = serde_json::to_value(&envelope).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["rows"].as_array().unwrap().len(), 4);
    assert_eq!(json["rows"][0][1], "Alice Johnson");
    assert!(json.get("error").is_none());
}
