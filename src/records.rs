//! Append-only escalation record persistence.
//!
//! Records are written once and never updated. The SQLite layout keeps the
//! `conversations(id, timestamp, summary, email, phone)` shape with two
//! extra columns: `reason` and `session_id`.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use support_harness_core::models::{EscalationReason, EscalationRecord};

/// A persisted record with its row id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: EscalationRecord,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append `record`, returning its row id.
    async fn append(&self, record: &EscalationRecord) -> Result<i64>;
    /// Most recent records first.
    async fn list(&self, limit: usize) -> Result<Vec<StoredRecord>>;
}

pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn append(&self, record: &EscalationRecord) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO conversations (timestamp, summary, email, phone, reason, session_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.timestamp.to_rfc3339())
        .bind(&record.summary)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(record.reason.as_str())
        .bind(&record.session_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list(&self, limit: usize) -> Result<Vec<StoredRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, summary, email, phone, reason, session_id
            FROM conversations
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let ts: String = row.get("timestamp");
                let timestamp = DateTime::parse_from_rfc3339(&ts)
                    .map_err(|e| anyhow!("invalid timestamp '{}' in conversations: {}", ts, e))?
                    .with_timezone(&Utc);
                let reason: String = row.get("reason");
                Ok(StoredRecord {
                    id: row.get("id"),
                    record: EscalationRecord {
                        timestamp,
                        session_id: row
                            .get::<Option<String>, _>("session_id")
                            .unwrap_or_default(),
                        reason: EscalationReason::parse(&reason)
                            .unwrap_or(EscalationReason::UserRequest),
                        summary: row.get("summary"),
                        email: row.get("email"),
                        phone: row.get("phone"),
                    },
                })
            })
            .collect()
    }
}

/// Record store kept in process memory.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn append(&self, record: &EscalationRecord) -> Result<i64> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let id = records.len() as i64 + 1;
        records.push(StoredRecord {
            id,
            record: record.clone(),
        });
        Ok(id)
    }

    async fn list(&self, limit: usize) -> Result<Vec<StoredRecord>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
