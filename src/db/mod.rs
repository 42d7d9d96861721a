//! Database abstraction layer for db-ask.
//!
//! The pipeline only sees the `DatabaseClient` trait: schema text for the
//! prompt and read-only execution of validated SQL. Concrete collaborators
//! live alongside it.

mod mock;
pub mod sample;
mod schema;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use schema::{Column, ForeignKey, Schema, Table};
pub use sqlite::{SqliteClient, MAX_ROWS};
pub use types::{QueryResult, Row, Value};

use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface for database collaborators.
///
/// Implementations must never mutate data through `execute_readonly`; the
/// statements they receive have already passed the safety policy.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Introspects the database schema, returning table and relationship information.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Returns the schema text handed to the SQL agent.
    ///
    /// Computed fresh on every call so schema changes are picked up.
    async fn schema_text(&self) -> Result<String> {
        Ok(self.introspect_schema().await?.format_for_llm())
    }

    /// Executes a validated, read-only SQL statement.
    async fn execute_readonly(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the underlying connection.
    async fn close(&self) -> Result<()>;
}
