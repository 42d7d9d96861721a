//! Read-only query policy.
//!
//! Every candidate statement must pass `validate_select` before it reaches the
//! database. The check is lexical and case-insensitive. It errs on the side of
//! rejection: a blocked keyword inside a string literal still fails.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{AskError, Result};

/// Keywords that may never appear as whole words in an executed statement.
pub const BLOCKED_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "INSERT", "UPDATE", "ALTER", "CREATE", "TRUNCATE", "ATTACH", "REPLACE",
    "PRAGMA", "DETACH", "VACUUM",
];

/// Why a statement was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The statement does not start with `SELECT`.
    NotSelect,
    /// A `;` appears before the end, so more than one statement may run.
    MultipleStatements,
    /// A blocked keyword appears as a whole word.
    BlockedKeyword(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSelect => write!(f, "only SELECT statements are allowed"),
            Self::MultipleStatements => write!(f, "multiple statements are not allowed"),
            Self::BlockedKeyword(keyword) => write!(f, "blocked keyword {keyword}"),
        }
    }
}

fn starts_with_select() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*SELECT\b").expect("valid select regex"))
}

fn blocked_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b(?:{})\b", BLOCKED_KEYWORDS.join("|")))
            .expect("valid keyword regex")
    })
}

/// Returns the first policy violation in `sql`, if any.
pub fn check(sql: &str) -> Option<Violation> {
    if !starts_with_select().is_match(sql) {
        return Some(Violation::NotSelect);
    }

    let body = sql.trim_end();
    let body = body.strip_suffix(';').unwrap_or(body);
    if body.contains(';') {
        return Some(Violation::MultipleStatements);
    }

    blocked_keyword()
        .find(sql)
        .map(|m| Violation::BlockedKeyword(m.as_str().to_uppercase()))
}

/// Accepts only a single read-only `SELECT` statement.
///
/// Returns `UnsafeQuery` describing the first violation.
pub fn validate_select(sql: &str) -> Result<()> {
    match check(sql) {
        None => Ok(()),
        Some(violation) => {
            tracing::warn!(violation = %violation, "Rejected generated SQL");
            Err(AskError::unsafe_query(violation.to_string()))
        }
    }
}
