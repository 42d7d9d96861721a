//! Deterministic summaries used when the model cannot produce one.

use crate::agents::sql::SqlAgentOutput;
use crate::db::Value;

/// Summary for an empty result set.
pub const NO_RESULTS_SUMMARY: &str =
    "No results were found for this query. The database might not contain matching records.";

/// Builds a summary from row count, column names and numeric statistics.
///
/// The count is the statement's true total; when the result was capped the
/// statistics cover only the rows that were kept. Never returns an empty string.
pub fn fallback_summary(output: &SqlAgentOutput) -> String {
    let row_count = output.row_count();
    if row_count == 0 {
        return NO_RESULTS_SUMMARY.to_string();
    }

    let rows_word = if row_count == 1 { "row" } else { "rows" };
    let mut summary = if output.columns.is_empty() {
        format!("The query returned {row_count} {rows_word}.")
    } else {
        format!(
            "The query returned {row_count} {rows_word} with columns: {}.",
            output.columns.join(", ")
        )
    };

    if output.is_truncated() {
        summary.push_str(&format!(
            " Only the first {} rows were kept, so the statistics cover only those.",
            output.rows.len()
        ));
    }

    for (index, column) in output.columns.iter().enumerate() {
        if let Some(stats) = NumericStats::for_column(output, index) {
            summary.push_str(&format!(
                " {column}: count {}, min {}, max {}, average {}.",
                stats.count,
                format_number(stats.min),
                format_number(stats.max),
                format_number(stats.mean())
            ));
        }
    }

    summary
}

/// Count, min, max and sum over the non-null values of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
struct NumericStats {
    count: usize,
    min: f64,
    max: f64,
    sum: f64,
}

impl NumericStats {
    /// Returns stats if every non-null value in the column is numeric.
    fn for_column(output: &SqlAgentOutput, index: usize) -> Option<Self> {
        let mut stats: Option<Self> = None;

        for value in output.rows.iter().filter_map(|row| row.get(index)) {
            if value.is_null() {
                continue;
            }
            let number = match value {
                Value::Int(_) | Value::Float(_) => value.as_f64()?,
                _ => return None,
            };
            stats = Some(match stats {
                None => Self {
                    count: 1,
                    min: number,
                    max: number,
                    sum: number,
                },
                Some(s) => Self {
                    count: s.count + 1,
                    min: s.min.min(number),
                    max: s.max.max(number),
                    sum: s.sum + number,
                },
            });
        }

        stats
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}
