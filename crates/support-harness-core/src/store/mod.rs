//! Vector storage abstraction.
//!
//! The [`VectorStore`] trait is the only contract the indexer and retriever
//! need, enabling pluggable backends (SQLite in the app crate, in-memory
//! here). Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, ChunkMetadata};

/// A stored chunk with its similarity to a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f64,
}

/// Append-mostly vector index keyed by chunk id.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](VectorStore::insert) | Store a chunk and its embedding |
/// | [`search`](VectorStore::search) | Top-`k` chunks by cosine similarity |
/// | [`count`](VectorStore::count) | Number of stored entries |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store `chunk` with its embedding. Re-inserting the same id replaces it.
    async fn insert(&self, chunk: &Chunk, vector: &[f32], model: &str) -> Result<()>;

    /// Return up to `k` chunks by descending cosine similarity.
    ///
    /// Entries whose dimensionality differs from `query_vec` are skipped.
    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;
}

/// Sort by descending score and keep the top `k`.
pub fn rank(mut candidates: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(k);
    candidates
}
