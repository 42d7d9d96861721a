//! Error types for db-ask.
//!
//! Defines the main error enum used throughout the pipeline, together with the
//! user-facing wording that ends up in a failed response envelope.

use thiserror::Error;

/// Main error type for db-ask operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AskError {
    /// Configuration errors (missing API key, invalid config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or introspection errors.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The model output did not contain an extractable SQL statement.
    #[error("Generation error: {0}")]
    Generation(String),

    /// The candidate SQL violated the read-only policy. Never executed.
    #[error("Unsafe query: {0}")]
    UnsafeQuery(String),

    /// The database rejected a validated statement (syntax, missing table, timeout).
    #[error("Execution error: {0}")]
    Execution(String),

    /// LLM failure worth retrying (timeout, connect failure, 5xx, rate limit).
    #[error("Transient LLM API error: {0}")]
    TransientApi(String),

    /// LLM failure that retrying cannot fix (auth, malformed request, bad response shape).
    #[error("Permanent LLM API error: {0}")]
    PermanentApi(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AskError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a generation error with the given message.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Creates an unsafe query error with the given message.
    pub fn unsafe_query(msg: impl Into<String>) -> Self {
        Self::UnsafeQuery(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a transient API error with the given message.
    pub fn transient_api(msg: impl Into<String>) -> Self {
        Self::TransientApi(msg.into())
    }

    /// Creates a permanent API error with the given message.
    pub fn permanent_api(msg: impl Into<String>) -> Self {
        Self::PermanentApi(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the retry policy may try the failed call again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientApi(_))
    }

    /// Returns true for failures that came from the LLM endpoint.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::TransientApi(_) | Self::PermanentApi(_))
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::Generation(_) => "Generation Error",
            Self::UnsafeQuery(_) => "Unsafe Query",
            Self::Execution(_) => "Execution Error",
            Self::TransientApi(_) => "LLM Unavailable",
            Self::PermanentApi(_) => "LLM Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the non-technical message shown in a failed response envelope.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(detail) => format!("The assistant is not configured correctly: {detail}"),
            Self::Connection(_) => {
                "I couldn't read the database structure. Check that the database is available."
                    .to_string()
            }
            Self::Generation(_) => "I couldn't understand your query. \
                 Please try rephrasing your question or ask for help with examples."
                .to_string(),
            Self::UnsafeQuery(_) => "The generated query was blocked because only read-only \
                 SELECT queries are allowed. Please rephrase your question."
                .to_string(),
            Self::Execution(_) => "The SQL query was generated but failed to execute. \
                 There might be an issue with the query or database."
                .to_string(),
            Self::TransientApi(_) => {
                "The language model is temporarily unavailable. Please try again in a moment."
                    .to_string()
            }
            Self::PermanentApi(_) => "The language model rejected the request. \
                 Check the model name and API key."
                .to_string(),
            Self::Internal(_) => "An unexpected error occurred while processing your query."
                .to_string(),
        }
    }
}

/// Result type alias using AskError.
pub type Result<T> = std::result::Result<T, AskError>;
