//! Demo database seeding.
//!
//! Creates the small department/usermaster/skills database used by
//! `ask --init-sample` and the integration tests.

use crate::error::{AskError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

const SAMPLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS department (
    dept_id INTEGER PRIMARY KEY AUTOINCREMENT,
    dept_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS usermaster (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    phone TEXT,
    dept_id INTEGER,
    FOREIGN KEY (dept_id) REFERENCES department(dept_id)
);

CREATE TABLE IF NOT EXISTS UserSkillAndRatings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    skill_name TEXT NOT NULL,
    rating INTEGER NOT NULL,
    FOREIGN KEY (user_id) REFERENCES usermaster(user_id)
);
"#;

const DEPARTMENTS: &[&str] = &["Engineering", "HR", "Finance"];

/// (full name, email, phone, department)
const USERS: &[(&str, &str, &str, &str)] = &[
    ("Alice Johnson", "alice@example.com", "9876543210", "Engineering"),
    ("Bob Sharma", "bob@example.com", "9123456780", "HR"),
    ("Charlie Singh", "charlie@example.com", "9988776655", "Engineering"),
    ("Deepa Patel", "deepa@example.com", "9000011111", "Finance"),
];

/// (full name, skill, rating)
const SKILLS: &[(&str, &str, i64)] = &[
    ("Alice Johnson", "Python", 5),
    ("Alice Johnson", "SQL", 4),
    ("Bob Sharma", "Recruitment", 5),
    ("Charlie Singh", "Python", 3),
    ("Charlie Singh", "DevOps", 4),
    ("Deepa Patel", "Excel", 5),
    ("Deepa Patel", "SQL", 4),
];

/// Creates the demo database at `path` unless the file already exists.
///
/// Returns `true` when the file was created and seeded.
pub async fn seed_sample_database(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| AskError::connection(format!("Cannot create {}: {e}", path.display())))?;

    let seed_error = |e: sqlx::Error| AskError::connection(format!("Failed to seed sample data: {e}"));

    let mut tx = pool.begin().await.map_err(seed_error)?;

    sqlx::raw_sql(SAMPLE_DDL)
        .execute(&mut *tx)
        .await
        .map_err(seed_error)?;

    for dept in DEPARTMENTS {
        sqlx::query("INSERT INTO department (dept_name) VALUES (?)")
            .bind(*dept)
            .execute(&mut *tx)
            .await
            .map_err(seed_error)?;
    }

    for (name, email, phone, dept) in USERS {
        sqlx::query(
            r#"
            INSERT INTO usermaster (full_name, email, phone, dept_id)
            VALUES (?, ?, ?, (SELECT dept_id FROM department WHERE dept_name = ?))
            "#,
        )
        .bind(*name)
        .bind(*email)
        .bind(*phone)
        .bind(*dept)
        .execute(&mut *tx)
        .await
        .map_err(seed_error)?;
    }

    for (name, skill, rating) in SKILLS {
        sqlx::query(
            r#"
            INSERT INTO UserSkillAndRatings (user_id, skill_name, rating)
            VALUES ((SELECT user_id FROM usermaster WHERE full_name = ?), ?, ?)
            "#,
        )
        .bind(*name)
        .bind(*skill)
        .bind(*rating)
        .execute(&mut *tx)
        .await
        .map_err(seed_error)?;
    }

    tx.commit().await.map_err(seed_error)?;
    pool.close().await;

    info!(
        path = %path.display(),
        departments = DEPARTMENTS.len(),
        users = USERS.len(),
        skills = SKILLS.len(),
        "Created sample database"
    );

    Ok(true)
}
