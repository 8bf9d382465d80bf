//! SQLite-backed store for offline demos and tests.
//!
//! Each top-level section is one row holding its JSON body. Nested paths such
//! as `alerts/history` are resolved inside that body, so the behavior matches
//! the Firebase backend for the operations the dashboard and simulator use.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::{Store, entry_mut, lookup, merge_patch, segments};
use crate::error::{Error, Result};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:blindstick.db?mode=rwc" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> Result<Self> {
        // Every connection to an in-memory database sees its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        Ok(store)
    }

    /// Create the sections table if it doesn't exist.
    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sections (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_section(&self, name: &str) -> Result<Value> {
        let row = sqlx::query(
            r#"
            SELECT body FROM sections WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(serde_json::from_str(&body)?)
            }
            None => Ok(Value::Null),
        }
    }

    async fn save_section(&self, name: &str, body: &Value) -> Result<()> {
        if body.is_null() {
            sqlx::query("DELETE FROM sections WHERE name = ?")
                .bind(name)
                .execute(&self.pool)
                .await?;
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO sections (name, body, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(serde_json::to_string(body)?)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Read-modify-write of the section that `path` lives in.
    async fn update<F>(&self, path: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Value) + Send,
    {
        let parts = segments(path);
        let Some((name, rest)) = parts.split_first() else {
            return Err(Error::store(path, "empty path"));
        };

        let mut body = self.load_section(name).await?;
        apply(entry_mut(&mut body, rest));
        self.save_section(name, &body).await
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let parts = segments(path);
        let Some((name, rest)) = parts.split_first() else {
            return Err(Error::store(path, "empty path"));
        };

        let body = self.load_section(name).await?;
        Ok(lookup(&body, rest).cloned())
    }

    async fn put(&self, path: &str, value: &Value) -> Result<()> {
        self.update(path, |target| *target = value.clone()).await
    }

    async fn patch(&self, path: &str, value: &Value) -> Result<()> {
        self.update(path, |target| merge_patch(target, value)).await
    }
}
