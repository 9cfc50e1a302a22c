//! In-memory [`VectorStore`] for tests and ephemeral runs.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over all stored vectors.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, ChunkMetadata};

use super::{rank, ScoredChunk, VectorStore};

struct StoredEntry {
    chunk_id: String,
    text: String,
    metadata: ChunkMetadata,
    vector: Vec<f32>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn insert(&self, chunk: &Chunk, vector: &[f32], _model: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|e| e.chunk_id != chunk.id);
        entries.push(StoredEntry {
            chunk_id: chunk.id.clone(),
            text: chunk.text.clone(),
            metadata: chunk.metadata.clone(),
            vector: vector.to_vec(),
        });
        Ok(())
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let candidates = entries
            .iter()
            .filter(|e| e.vector.len() == query_vec.len())
            .map(|e| ScoredChunk {
                chunk_id: e.chunk_id.clone(),
                text: e.text.clone(),
                metadata: e.metadata.clone(),
                score: cosine_similarity(query_vec, &e.vector) as f64,
            })
            .collect();
        Ok(rank(candidates, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().unwrap_or_else(|e| e.into_inner()).len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            chunk_index: 0,
            text: text.to_string(),
            hash: String::new(),
            metadata: ChunkMetadata::website(),
        }
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = InMemoryVectorStore::new();
        store.insert(&chunk("a", "A"), &[1.0, 0.0], "m").await.unwrap();
        store.insert(&chunk("b", "B"), &[0.7, 0.7], "m").await.unwrap();
        store.insert(&chunk("c", "C"), &[0.0, 1.0], "m").await.unwrap();

        let hits = store.search(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, "a");
        assert_eq!(hits[1].chunk_id, "b");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_mismatched_dims_are_excluded() {
        let store = InMemoryVectorStore::new();
        store.insert(&chunk("a", "A"), &[1.0, 0.0, 0.0], "m").await.unwrap();
        store.insert(&chunk("b", "B"), &[1.0, 0.0], "m").await.unwrap();
        let hits = store.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "b");
    }

    #[tokio::test]
    async fn test_same_id_replaces_and_distinct_ids_accumulate() {
        let store = InMemoryVectorStore::new();
        store.insert(&chunk("a", "A"), &[1.0], "m").await.unwrap();
        store.insert(&chunk("a", "A2"), &[1.0], "m").await.unwrap();
        store.insert(&chunk("b", "A2"), &[1.0], "m").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let store = InMemoryVectorStore::new();
        assert!(store.search(&[1.0], 4).await.unwrap().is_empty());
    }
}
