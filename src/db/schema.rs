//! Database schema types for db-ask.
//!
//! Represents the structure of a database (tables, columns, foreign keys) and
//! renders it as the schema text handed to the SQL agent.

use serde::{Deserialize, Serialize};

/// Represents the complete schema of a database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// All tables in the schema.
    pub tables: Vec<Table>,

    /// Foreign key relationships between tables.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats the schema for inclusion in an LLM prompt.
    ///
    /// Tables are numbered and each column carries its type plus `PK`,
    /// `NOT NULL`, `DEFAULT` and `FK -> table.column` annotations.
    pub fn format_for_llm(&self) -> String {
        let mut lines = vec!["Tables and Columns:".to_string(), String::new()];

        for (i, table) in self.tables.iter().enumerate() {
            lines.push(format!("{}) {}", i + 1, table.name));
            lines.extend(
                table
                    .columns
                    .iter()
                    .map(|column| self.format_column_for_llm(table, column)),
            );
            lines.push(String::new());
        }

        lines.join("\n")
    }

    fn format_column_for_llm(&self, table: &Table, column: &Column) -> String {
        let is_pk = table.primary_key.contains(&column.name);
        let data_type = if column.data_type.is_empty() {
            "ANY"
        } else {
            column.data_type.as_str()
        };

        let mut annotations = vec![data_type.to_string()];
        if is_pk {
            annotations.push("PK".to_string());
        }
        if !column.is_nullable && !is_pk {
            annotations.push("NOT NULL".to_string());
        }
        if let Some(default) = &column.default {
            annotations.push(format!("DEFAULT {default}"));
        }
        annotations.extend(
            self.foreign_keys
                .iter()
                .filter_map(|fk| fk.target_for(&table.name, &column.name))
                .map(|(to_table, to_column)| format!("FK -> {to_table}.{to_column}")),
        );

        format!("   - {} ({})", column.name, annotations.join(", "))
    }

    /// Returns the table with the given name, ignoring case.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in the table.
    pub columns: Vec<Column>,

    /// Column names that form the primary key.
    pub primary_key: Vec<String>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Adds a column.
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key columns.
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared data type (e.g., "INTEGER", "TEXT"). May be empty in SQLite.
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,

    /// Default value expression, if any.
    pub default: Option<String>,
}

impl Column {
    /// Creates a new column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }

    /// Sets the default value.
    pub fn with_default(self, default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            ..self
        }
    }
}

/// Represents a foreign key relationship between tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Source table name.
    pub from_table: String,

    /// Source column names.
    pub from_columns: Vec<String>,

    /// Target table name.
    pub to_table: String,

    /// Target column names. Positionally aligned with `from_columns`.
    pub to_columns: Vec<String>,
}

impl ForeignKey {
    /// Creates a new foreign key relationship.
    pub fn new(
        from_table: impl Into<String>,
        from_columns: Vec<String>,
        to_table: impl Into<String>,
        to_columns: Vec<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_columns,
            to_table: to_table.into(),
            to_columns,
        }
    }

    /// Returns the referenced (table, column) if this key starts at `table.column`.
    fn target_for(&self, table: &str, column: &str) -> Option<(&str, &str)> {
        if self.from_table != table {
            return None;
        }
        let position = self.from_columns.iter().position(|c| c == column)?;
        let to_column = self
            .to_columns
            .get(position)
            .or_else(|| self.to_columns.first())
            .map(String::as_str)
            .unwrap_or("");
        Some((self.to_table.as_str(), to_column))
    }
}
