//! The pipeline's response envelope.
//!
//! In memory the envelope is a tagged enum, so a partial envelope cannot be
//! built. On the wire it is the flat object
//! `{success, sql_query?, columns?, rows?, summary?, error?}`; inconsistent
//! combinations are rejected when deserializing.

use serde::{Deserialize, Serialize};

use crate::agents::sql::SqlAgentOutput;
use crate::agents::summary::SummaryOutput;
use crate::agents::visualization::{recommend_chart, ChartRecommendation};
use crate::db::Row;

/// Final result of answering one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "EnvelopeWire", try_from = "EnvelopeWire")]
pub enum ResponseEnvelope {
    /// The query ran and was summarized.
    Success {
        sql_query: String,
        columns: Vec<String>,
        rows: Vec<Row>,
        summary: String,
    },
    /// The pipeline stopped; `error` is a user-facing message.
    Failure { error: String },
}

impl ResponseEnvelope {
    /// Builds a success envelope from the two stage outputs.
    pub fn success(sql_output: SqlAgentOutput, summary: SummaryOutput) -> Self {
        Self::Success {
            sql_query: sql_output.sql_query,
            columns: sql_output.columns,
            rows: sql_output.rows,
            summary: summary.summary,
        }
    }

    /// Builds a failure envelope.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Returns true for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the executed SQL, if any.
    pub fn sql_query(&self) -> Option<&str> {
        match self {
            Self::Success { sql_query, .. } => Some(sql_query),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the summary, if any.
    pub fn summary(&self) -> Option<&str> {
        match self {
            Self::Success { summary, .. } => Some(summary),
            Self::Failure { .. } => None,
        }
    }

    /// Recommends a chart for the rows of a successful, non-empty envelope.
    pub fn chart(&self) -> Option<ChartRecommendation> {
        match self {
            Self::Success {
                sql_query,
                columns,
                rows,
                ..
            } => recommend_chart(columns, rows, Some(sql_query.as_str())),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the error message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// Flat wire form of `ResponseEnvelope`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EnvelopeWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sql_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ResponseEnvelope> for EnvelopeWire {
    fn from(envelope: ResponseEnvelope) -> Self {
        match envelope {
            ResponseEnvelope::Success {
                sql_query,
                columns,
                rows,
                summary,
            } => Self {
                success: true,
                sql_query: Some(sql_query),
                columns: Some(columns),
                rows: Some(rows),
                summary: Some(summary),
                error: None,
            },
            ResponseEnvelope::Failure { error } => Self {
                success: false,
                error: Some(error),
                ..Self::default()
            },
        }
    }
}

impl TryFrom<EnvelopeWire> for ResponseEnvelope {
    type Error = String;

    fn try_from(wire: EnvelopeWire) -> Result<Self, Self::Error> {
        match wire {
            EnvelopeWire {
                success: true,
                sql_query: Some(sql_query),
                columns: Some(columns),
                rows: Some(rows),
                summary: Some(summary),
                error: None,
            } => {
                if let Some(bad) = rows.iter().position(|row| row.len() != columns.len()) {
                    return Err(format!(
                        "row {bad} has a different width than the {} columns",
                        columns.len()
                    ));
                }
                Ok(Self::Success {
                    sql_query,
                    columns,
                    rows,
                    summary,
                })
            }
            EnvelopeWire {
                success: false,
                sql_query: None,
                columns: None,
                rows: None,
                summary: None,
                error: Some(error),
            } => Ok(Self::Failure { error }),
            EnvelopeWire { success: true, .. } => Err(
                "a successful envelope needs sql_query, columns, rows and summary, and no error"
                    .to_string(),
            ),
            EnvelopeWire { success: false, .. } => {
                Err("a failed envelope carries only an error".to_string())
            }
        }
    }
}
