//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient` trait
//! for SQLite files using sqlx. The pool is opened read-only, so even a
//! statement that slipped past validation cannot modify the file.

use crate::db::{Column, DatabaseClient, ForeignKey, QueryResult, Row, Schema, Table, Value};
use crate::error::{AskError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, Statement, TypeInfo, ValueRef};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum rows to return from a query.
pub const MAX_ROWS: usize = 1000;

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
    path: PathBuf,
    query_timeout: Duration,
}

impl SqliteClient {
    /// Opens the database file at `path` in read-only mode.
    pub async fn open(path: impl AsRef<Path>, query_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(AskError::connection(format!(
                "Database file {} does not exist. Use --init-sample to create the demo database.",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                AskError::connection(format!("Cannot open {}: {e}", path.display()))
            })?;

        debug!(path = %path.display(), "Opened SQLite database read-only");

        Ok(Self {
            pool,
            path,
            query_timeout,
        })
    }

    /// Returns the path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        let table_names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AskError::connection(format!("Failed to fetch tables: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());
        let mut foreign_keys = Vec::new();

        for table_name in table_names {
            tables.push(self.fetch_table(&table_name).await?);
            foreign_keys.extend(self.fetch_foreign_keys(&table_name).await?);
        }

        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn execute_readonly(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let (columns, rows, total_rows) =
            tokio::time::timeout(self.query_timeout, self.fetch_capped(sql))
                .await
                .map_err(|_| {
                    AskError::execution(format!(
                        "Query timed out after {} seconds",
                        self.query_timeout.as_secs()
                    ))
                })?
                .map_err(|e| AskError::execution(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns = match columns {
            Some(columns) => columns,
            None => self.fetch_column_names(sql).await,
        };

        if total_rows > rows.len() {
            warn!(
                total_rows,
                max_rows = MAX_ROWS,
                "Query result truncated"
            );
        }

        debug!(
            rows = rows.len(),
            total_rows,
            duration_ms = execution_time.as_millis() as u64,
            "Query executed"
        );

        Ok(QueryResult::with_data(columns, rows)
            .with_total_rows(total_rows)
            .with_execution_time(execution_time))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteClient {
    /// Streams the result set, converting at most `MAX_ROWS` rows and counting the rest.
    ///
    /// Column names come from the first row; `None` when there are no rows.
    async fn fetch_capped(
        &self,
        sql: &str,
    ) -> std::result::Result<(Option<Vec<String>>, Vec<Row>, usize), sqlx::Error> {
        let mut stream = sqlx::query(sql).fetch(&self.pool);
        let mut columns = None;
        let mut rows = Vec::new();
        let mut total_rows = 0usize;

        while let Some(row) = stream.try_next().await? {
            if columns.is_none() {
                columns = Some(
                    row.columns()
                        .iter()
                        .map(|col| col.name().to_string())
                        .collect(),
                );
            }
            if rows.len() < MAX_ROWS {
                rows.push(convert_row(&row));
            }
            total_rows += 1;
        }

        Ok((columns, rows, total_rows))
    }

    /// Reads column names from prepared statement metadata.
    ///
    /// Used when a query returns no rows. Best effort: an empty list on failure.
    async fn fetch_column_names(&self, sql: &str) -> Vec<String> {
        match (&self.pool).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
            Err(e) => {
                debug!(error = %e, "Could not prepare statement for column metadata");
                Vec::new()
            }
        }
    }

    /// Fetches the columns and primary key of one table.
    async fn fetch_table(&self, table_name: &str) -> Result<Table> {
        let rows: Vec<(String, String, i64, Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT name, type, "notnull", dflt_value, pk
            FROM pragma_table_info(?)
            ORDER BY cid
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AskError::connection(format!("Failed to fetch columns for {table_name}: {e}"))
        })?;

        let mut pk_columns: Vec<(i64, String)> = Vec::new();
        let mut columns = Vec::with_capacity(rows.len());

        for (name, data_type, not_null, default, pk) in rows {
            if pk > 0 {
                pk_columns.push((pk, name.clone()));
            }
            columns.push(Column {
                name,
                data_type,
                is_nullable: not_null == 0,
                default,
            });
        }

        pk_columns.sort();

        Ok(Table {
            name: table_name.to_string(),
            columns,
            primary_key: pk_columns.into_iter().map(|(_, name)| name).collect(),
        })
    }

    /// Fetches the foreign keys declared on one table, grouped by constraint.
    async fn fetch_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKey>> {
        let rows: Vec<(i64, i64, String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT id, seq, "table", "from", "to"
            FROM pragma_foreign_key_list(?)
            ORDER BY id, seq
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AskError::connection(format!(
                "Failed to fetch foreign keys for {table_name}: {e}"
            ))
        })?;

        let mut by_id: BTreeMap<i64, ForeignKey> = BTreeMap::new();

        for (id, _seq, to_table, from_column, to_column) in rows {
            let fk = by_id.entry(id).or_insert_with(|| ForeignKey {
                from_table: table_name.to_string(),
                to_table,
                ..ForeignKey::default()
            });
            // A NULL target refers to the parent's primary key.
            let to_column = to_column.unwrap_or_else(|| from_column.clone());
            fk.from_columns.push(from_column);
            fk.to_columns.push(to_column);
        }

        Ok(by_id.into_values().collect())
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single column value using the storage class of the stored value.
///
/// SQLite is dynamically typed, so the declared column type is not reliable.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" | "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Extracts the engine message from a query error.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
