//! Prompt construction for the agents.

use crate::db::{Row, Value};

/// Maximum number of rows shown to the summary model.
pub const MAX_SUMMARY_ROWS: usize = 20;

/// System prompt for SQL generation.
pub const SQL_SYSTEM_PROMPT: &str = r#"You are an expert SQL query generator. Your job is to:

1. Analyze the user's natural language request
2. Examine the provided database schema
3. Generate a valid SQL query that answers the user's question
4. Return ONLY the SQL query, nothing else

Rules:
- Generate SQLite-compatible SQL queries only
- Generate exactly one SELECT statement (no INSERT, UPDATE, DELETE or DDL)
- Use proper JOIN syntax when needed
- Use appropriate WHERE clauses for filtering
- For aggregations, use GROUP BY when necessary
- Do NOT include explanations or markdown formatting
- Do NOT wrap the query in ``` code blocks
- Return just the raw SQL query

Example:
User: "show all users"
Schema: usermaster(user_id, full_name, email)
Output: SELECT * FROM usermaster;"#;

/// System prompt for result summaries.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You are a data analyst who explains query results in clear, natural language.

Your job is to:
1. Analyze the SQL query results
2. Identify key insights and patterns
3. Generate a concise, human-friendly summary

Guidelines:
- Be concise but informative (2-4 sentences)
- Mention specific numbers and values when relevant
- Point out notable findings instead of listing the data
- Use natural, conversational language

Example:
Query: "SELECT dept_name, COUNT(*) FROM usermaster JOIN department ..."
Results: [("Engineering", 2), ("HR", 1), ("Finance", 1)]
Summary: "Engineering is the largest department with 2 people, while HR and Finance have 1 each. Engineering makes up half of the workforce.""#;

/// Builds the user message for SQL generation.
///
/// The schema text is embedded verbatim.
pub fn build_sql_prompt(schema_text: &str, question: &str) -> String {
    format!(
        "Database Schema:\n{schema_text}\n\nUser Request: {question}\n\n\
         Generate a SQL query to answer this request. Return ONLY the SQL query."
    )
}

/// Builds the user message for summarizing query results.
///
/// `total_rows` is the number of rows the statement produced, which may be
/// more than `rows` holds.
pub fn build_summary_prompt(
    question: &str,
    sql_query: &str,
    columns: &[String],
    rows: &[Row],
    total_rows: usize,
) -> String {
    format!(
        "User's Question: {question}\n\nSQL Query:\n{sql_query}\n\nQuery Results:\n{}\n\n\
         Provide a clear, insightful summary of these results in 2-4 sentences. \
         Focus on key findings and patterns.",
        format_results(columns, rows, total_rows, MAX_SUMMARY_ROWS)
    )
}

/// Renders at most `max_rows` rows as `column=value` lines.
///
/// The header and the trailing "more rows" line count against `total_rows`.
pub fn format_results(
    columns: &[String],
    rows: &[Row],
    total_rows: usize,
    max_rows: usize,
) -> String {
    let total_rows = total_rows.max(rows.len());
    let mut lines = vec![
        format!("Columns: {}", columns.join(", ")),
        format!("Total rows: {total_rows}"),
        String::new(),
        "Data:".to_string(),
    ];

    for (i, row) in rows.iter().take(max_rows).enumerate() {
        let cells: Vec<String> = columns
            .iter()
            .zip(row.iter())
            .map(|(column, value)| format!("{column}={}", format_cell(value)))
            .collect();
        lines.push(format!("  Row {}: {}", i + 1, cells.join(", ")));
    }

    let shown = rows.len().min(max_rows);
    if total_rows > shown {
        lines.push(format!("  ... and {} more rows", total_rows - shown));
    }

    lines.join("\n")
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_display_string(),
    }
}
