//! Response cleaning for SQL generation.
//!
//! Turns raw model output (code fences, leading prose, trailing explanations)
//! into a single candidate statement terminated by exactly one `;`. The result
//! is still untrusted; `safety::validate_select` decides whether it may run.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AskError, Result};

/// Verbs that mark the start of a SQL statement.
const STATEMENT_VERBS: &str = "SELECT|WITH|INSERT|UPDATE|DELETE|REPLACE|DROP|CREATE|ALTER|TRUNCATE|ATTACH|DETACH|PRAGMA|VACUUM|EXPLAIN";

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)```(?:sqlite|sql)?[ \t]*\r?\n?(.*?)```").expect("valid fence regex")
    })
}

fn fence_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)```(?:sqlite|sql)?").expect("valid fence marker regex"))
}

fn leading_verb() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)^(?:{STATEMENT_VERBS})\b")).expect("valid verb regex")
    })
}

fn select_upper() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bSELECT\b").expect("valid select regex"))
}

fn select_any_case() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bSELECT\b").expect("valid select regex"))
}

/// Extracts a single SQL statement from a model response.
///
/// Steps:
/// 1. If the response contains a fenced code block (```` ``` ```` or ```` ```sql ````,
///    any case), only its content is kept. Stray fence markers are removed.
/// 2. Text starting with `SELECT` is kept whole. Otherwise the statement starts
///    at the first whole-word `SELECT`, preferring an upper-case occurrence over
///    prose such as "you can select". Leading words like "With" or "Update:"
///    are prose when a `SELECT` follows. Text with no `SELECT` that starts with
///    another statement verb is kept whole for validation to reject.
/// 3. Prose after the first `;` is dropped. Another statement after it is kept,
///    so validation sees and rejects it.
/// 4. Trailing whitespace and semicolons are trimmed and one `;` appended.
///
/// Returns a `Generation` error when no statement can be found.
pub fn clean_sql_response(response: &str) -> Result<String> {
    let unfenced = strip_fences(response);
    let text = unfenced.trim();

    let statement = if starts_with_select(text) {
        text
    } else if let Some(start) = first_select(text) {
        &text[start..]
    } else if leading_verb().is_match(text) {
        text
    } else {
        return Err(AskError::generation(format!(
            "No SQL statement found in model output: {}",
            preview(text)
        )));
    };

    let statement = drop_trailing_prose(statement)
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace());

    if statement.is_empty() {
        return Err(AskError::generation("Model output contained an empty statement"));
    }

    Ok(format!("{statement};"))
}

fn starts_with_select(text: &str) -> bool {
    select_any_case().find(text).is_some_and(|m| m.start() == 0)
}

fn first_select(text: &str) -> Option<usize> {
    select_upper()
        .find(text)
        .or_else(|| select_any_case().find(text))
        .map(|m| m.start())
}

fn strip_fences(response: &str) -> String {
    match fenced_block().captures(response).and_then(|c| c.get(1)) {
        Some(content) => content.as_str().to_string(),
        None => fence_marker().replace_all(response, "").into_owned(),
    }
}

/// Cuts the statement at its first `;` unless SQL follows.
fn drop_trailing_prose(statement: &str) -> &str {
    let Some(pos) = statement.find(';') else {
        return statement;
    };

    let rest = statement[pos + 1..].trim_start();
    if rest.is_empty() || leading_verb().is_match(rest) {
        statement
    } else {
        &statement[..pos]
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    if text.chars().count() > MAX {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    } else {
        text.to_string()
    }
}
