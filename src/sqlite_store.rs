//! SQLite-backed [`VectorStore`] implementation.
//!
//! Each insert writes the chunk row, its embedding metadata, and the vector
//! BLOB in one transaction. Search is brute-force cosine similarity over
//! every stored vector, which is adequate for a single-site knowledge base.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use support_harness_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use support_harness_core::models::{Chunk, ChunkMetadata};
use support_harness_core::store::{rank, ScoredChunk, VectorStore};

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Chunk counts grouped by source, largest first.
    pub async fn source_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT source, COUNT(*) AS n FROM chunks GROUP BY source ORDER BY n DESC, source",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| (row.get("source"), row.get("n")))
            .collect())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert(&self, chunk: &Chunk, vector: &[f32], model: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let metadata_json = serde_json::to_string(&chunk.metadata)?;
        let blob = vec_to_blob(vector);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chunks (id, chunk_index, text, hash, source, metadata_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                chunk_index = excluded.chunk_index,
                text = excluded.text,
                hash = excluded.hash,
                source = excluded.source,
                metadata_json = excluded.metadata_json
            "#,
        )
        .bind(&chunk.id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .bind(&chunk.metadata.source)
        .bind(&metadata_json)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO embeddings (chunk_id, model, dims, created_at, hash)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(chunk_id) DO UPDATE SET
                model = excluded.model,
                dims = excluded.dims,
                created_at = excluded.created_at,
                hash = excluded.hash
            "#,
        )
        .bind(&chunk.id)
        .bind(model)
        .bind(vector.len() as i64)
        .bind(now)
        .bind(&chunk.hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO chunk_vectors (chunk_id, embedding)
            VALUES (?, ?)
            ON CONFLICT(chunk_id) DO UPDATE SET
                embedding = excluded.embedding
            "#,
        )
        .bind(&chunk.id)
        .bind(&blob)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT cv.chunk_id, cv.embedding, c.text, c.metadata_json
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let vec = blob_to_vec(&blob);
            if vec.len() != query_vec.len() {
                continue;
            }
            let metadata_json: String = row.get("metadata_json");
            let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)
                .unwrap_or_else(|_| ChunkMetadata::new("unknown"));
            candidates.push(ScoredChunk {
                chunk_id: row.get("chunk_id"),
                text: row.get("text"),
                metadata,
                score: cosine_similarity(query_vec, &vec) as f64,
            });
        }

        Ok(rank(candidates, k))
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteVectorStore) {
        let tmp = TempDir::new().unwrap();
        let pool = db::connect_path(&tmp.path().join("desk.sqlite")).await.unwrap();
        migrate::apply(&pool).await.unwrap();
        (tmp, SqliteVectorStore::new(pool))
    }

    fn chunk(id: &str, text: &str, source: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            chunk_index: 0,
            text: text.to_string(),
            hash: format!("h-{}", id),
            metadata: ChunkMetadata::new(source),
        }
    }

    #[tokio::test]
    async fn test_insert_and_search() {
        let (_tmp, store) = store().await;
        store
            .insert(&chunk("a", "Pool opens at 8am", "website"), &[1.0, 0.0], "hash")
            .await
            .unwrap();
        store
            .insert(&chunk("b", "Late checkout", "faq.pdf"), &[0.0, 1.0], "hash")
            .await
            .unwrap();

        let hits = store.search(&[0.9, 0.1], 4).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, "a");
        assert_eq!(hits[0].text, "Pool opens at 8am");
        assert_eq!(hits[0].metadata.source, "website");
        assert_eq!(store.count().await.unwrap(), 2);

        let counts = store.source_counts().await.unwrap();
        assert_eq!(counts.len(), 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_skipped() {
        let (_tmp, store) = store().await;
        store
            .insert(&chunk("a", "three dims", "website"), &[1.0, 0.0, 0.0], "m")
            .await
            .unwrap();
        assert!(store.search(&[1.0, 0.0], 4).await.unwrap().is_empty());
    }
}
