//! Per-source checkpoints.
//!
//! The website refresh path stores the fingerprint of the last indexed
//! scrape here so a restart does not re-index unchanged content.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, source: &str) -> Result<Option<String>>;
    async fn save(&self, source: &str, cursor: &str) -> Result<()>;
}

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn load(&self, source: &str) -> Result<Option<String>> {
        let cursor: Option<String> =
            sqlx::query_scalar("SELECT cursor FROM checkpoints WHERE source = ?")
                .bind(source)
                .fetch_optional(&self.pool)
                .await?;
        Ok(cursor)
    }

    async fn save(&self, source: &str, cursor: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO checkpoints (source, cursor, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(source) DO UPDATE SET
                cursor = excluded.cursor,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(source)
        .bind(cursor)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCheckpointStore {
    cursors: Mutex<HashMap<String, String>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, source: &str) -> Result<Option<String>> {
        let cursors = self.cursors.lock().unwrap_or_else(|e| e.into_inner());
        Ok(cursors.get(source).cloned())
    }

    async fn save(&self, source: &str, cursor: &str) -> Result<()> {
        let mut cursors = self.cursors.lock().unwrap_or_else(|e| e.into_inner());
        cursors.insert(source.to_string(), cursor.to_string());
        Ok(())
    }
}
