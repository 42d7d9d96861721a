//! Terminal rendering of response envelopes.

use crate::agents::ResponseEnvelope;
use crate::cli::OutputFormat;
use crate::db::Row;
use crate::error::{AskError, Result};

/// Rows shown in the text table before the rest are elided.
pub const MAX_DISPLAY_ROWS: usize = 50;

/// Renders an envelope in the requested format.
pub fn render(envelope: &ResponseEnvelope, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(envelope)),
        OutputFormat::Json => render_json(envelope),
    }
}

/// Renders the envelope as pretty-printed JSON.
pub fn render_json(envelope: &ResponseEnvelope) -> Result<String> {
    serde_json::to_string_pretty(envelope)
        .map_err(|e| AskError::internal(format!("Failed to serialize response: {e}")))
}

/// Renders the envelope for a human reader.
pub fn render_text(envelope: &ResponseEnvelope) -> String {
    match envelope {
        ResponseEnvelope::Success {
            sql_query,
            columns,
            rows,
            summary,
        } => {
            let mut output = format!("SQL:\n  {sql_query}\n\n");

            if !columns.is_empty() {
                output.push_str(&format_table(columns, rows));
                output.push('\n');
            }

            let rows_word = if rows.len() == 1 { "row" } else { "rows" };
            output.push_str(&format!("({} {rows_word})\n", rows.len()));
            if let Some(chart) = envelope.chart().filter(|c| c.is_chart()) {
                output.push_str(&format!("Chart: {}\n", chart.recommendation));
            }
            output.push('\n');
            output.push_str(summary);
            output
        }
        ResponseEnvelope::Failure { error } => format!("Error: {error}"),
    }
}

fn format_table(headers: &[String], rows: &[Row]) -> String {
    let shown = &rows[..rows.len().min(MAX_DISPLAY_ROWS)];
    let cells: Vec<Vec<String>> = shown
        .iter()
        .map(|row| row.iter().map(|v| v.to_display_string()).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let mut output = String::new();

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    output.push_str(header_line.join(" │ ").trim_end());
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    output.push_str(&separator.join("─┼─"));
    output.push('\n');

    for row in &cells {
        let row_line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = width)
            })
            .collect();
        output.push_str(row_line.join(" │ ").trim_end());
        output.push('\n');
    }

    if rows.len() > shown.len() {
        output.push_str(&format!("... {} more rows\n", rows.len() - shown.len()));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Value;
    use pretty_assertions::assert_eq;

    fn envelope(rows: Vec<Row>) -> ResponseEnvelope {
        ResponseEnvelope::Success {
            sql_query: "SELECT dept_id, dept_name FROM department;".to_string(),
            columns: vec!["dept_id".to_string(), "dept_name".to_string()],
            rows,
            summary: "There are two departments.".to_string(),
        }
    }

    #[test]
    fn test_text_success() {
        let text = render_text(&envelope(vec![
            vec![Value::Int(1), Value::from("Engineering")],
            vec![Value::Int(2), Value::from("HR")],
        ]));

        assert_eq!(
            text,
            "SQL:\n  SELECT dept_id, dept_name FROM department;\n\n\
             dept_id │ dept_name\n\
             ────────┼────────────\n\
             1       │ Engineering\n\
             2       │ HR\n\
             \n(2 rows)\n\
             Chart: Pie chart showing distribution of 2 segments.\n\n\
             There are two departments."
        );
    }

    #[test]
    fn test_table_like_rows_get_no_chart_line() {
        let envelope = ResponseEnvelope::Success {
            sql_query: "SELECT user_id, full_name, email FROM usermaster WHERE user_id = 1;"
                .to_string(),
            columns: vec!["user_id".into(), "full_name".into(), "email".into()],
            rows: vec![vec![
                Value::Int(1),
                Value::from("Alice Johnson"),
                Value::from("alice@example.com"),
            ]],
            summary: "Alice works here.".to_string(),
        };

        let text = render_text(&envelope);

        assert!(!text.contains("Chart:"));
        assert!(text.ends_with("(1 row)\n\nAlice works here."));
    }

    #[test]
    fn test_text_failure() {
        let text = render_text(&ResponseEnvelope::failure("Could not run the query."));
        assert_eq!(text, "Error: Could not run the query.");
    }

    #[test]
    fn test_long_results_are_elided() {
        let rows = (0..MAX_DISPLAY_ROWS + 3)
            .map(|i| vec![Value::Int(i as i64), Value::from("x")])
            .collect();
        let text = render_text(&envelope(rows));

        assert!(text.contains("... 3 more rows"));
        assert!(text.contains(&format!("({} rows)", MAX_DISPLAY_ROWS + 3)));
    }

    #[test]
    fn test_null_cells() {
        let text = render_text(&envelope(vec![vec![Value::Int(7), Value::Null]]));
        assert!(text.contains("7       │ NULL"));
        assert!(text.contains("(1 row)"));
    }

    #[test]
    fn test_json_matches_envelope_wire_form() {
        let failure = ResponseEnvelope::failure("nope");
        let json = render(&failure, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value, serde_json::json!({"success": false, "error": "nope"}));
    }
}
