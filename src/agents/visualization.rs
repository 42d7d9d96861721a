//! Chart recommendation for query results.
//!
//! The choice is made from the result's shape alone: how many columns are
//! numeric, how many rows came back, and whether the statement aggregates.
//! No model call is involved.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::db::{Row, Value};

/// Category rows up to which a pie chart is preferred over a bar chart.
pub const MAX_PIE_SEGMENTS: usize = 7;

/// Rows above which an all-numeric result is drawn as a line.
const MIN_LINE_POINTS: usize = 10;

/// Kind of chart suited to a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Pie,
    Line,
    Scatter,
    /// The rows read best as a plain table.
    #[serde(rename = "none")]
    NoChart,
}

impl ChartType {
    /// Returns the lowercase name used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Pie => "pie",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::NoChart => "none",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chart type plus a one-line explanation for the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRecommendation {
    pub chart_type: ChartType,
    pub recommendation: String,
}

impl ChartRecommendation {
    fn new(chart_type: ChartType, row_count: usize) -> Self {
        let recommendation = match chart_type {
            ChartType::Bar => format!("Bar chart showing comparison across {row_count} categories."),
            ChartType::Pie => format!("Pie chart showing distribution of {row_count} segments."),
            ChartType::Line => format!("Line chart showing trend across {row_count} data points."),
            ChartType::Scatter => "Scatter plot showing relationship between variables.".to_string(),
            ChartType::NoChart => "This data is best viewed as a table.".to_string(),
        };
        Self {
            chart_type,
            recommendation,
        }
    }

    /// Returns true unless the rows read best as a table.
    pub fn is_chart(&self) -> bool {
        self.chart_type != ChartType::NoChart
    }
}

/// Recommends a chart for a result set. Returns `None` for an empty result.
///
/// Decision order:
/// 1. a single row with more than two columns is left as a table
/// 2. one label column and one numeric column: pie for up to seven rows, bar otherwise
/// 3. two numeric columns: scatter
/// 4. any mix of label and numeric columns: bar
/// 5. an aggregating statement: bar
/// 6. numeric columns only, more than ten rows: line
/// 7. any label column: bar, otherwise a table
pub fn recommend_chart(
    columns: &[String],
    rows: &[Row],
    sql_query: Option<&str>,
) -> Option<ChartRecommendation> {
    if rows.is_empty() {
        return None;
    }

    let row_count = rows.len();
    let column_count = columns.len();
    let numeric = (0..column_count)
        .filter(|&index| is_numeric_column(rows, index))
        .count();
    let categorical = column_count - numeric;
    let aggregating = sql_query.is_some_and(is_aggregation);

    let chart_type = if column_count == 0 || (row_count == 1 && column_count > 2) {
        ChartType::NoChart
    } else if column_count == 2 && categorical == 1 && numeric == 1 {
        if row_count <= MAX_PIE_SEGMENTS {
            ChartType::Pie
        } else {
            ChartType::Bar
        }
    } else if column_count == 2 && numeric == 2 {
        ChartType::Scatter
    } else if categorical >= 1 && numeric >= 1 {
        ChartType::Bar
    } else if aggregating {
        ChartType::Bar
    } else if row_count > MIN_LINE_POINTS && numeric >= 1 {
        ChartType::Line
    } else if categorical >= 1 {
        ChartType::Bar
    } else {
        ChartType::NoChart
    };

    Some(ChartRecommendation::new(chart_type, row_count))
}

/// A column is numeric when it has at least one value and every non-null
/// value is an integer or a float.
fn is_numeric_column(rows: &[Row], index: usize) -> bool {
    let mut seen = false;
    for value in rows.iter().filter_map(|row| row.get(index)) {
        match value {
            Value::Null => {}
            Value::Int(_) | Value::Float(_) => seen = true,
            _ => return false,
        }
    }
    seen
}

fn aggregation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(COUNT|SUM|AVG|MAX|MIN)\s*\(|\bGROUP\s+BY\b")
            .expect("aggregation pattern is valid")
    })
}

fn is_aggregation(sql: &str) -> bool {
    aggregation_pattern().is_match(sql)
}
