//! Nearest-chunk retrieval for answer generation.
//!
//! Retrieval is best effort: any failure degrades to "no context", which the
//! escalation engine treats as a reason to hand off to a human.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::models::RetrievedChunk;
use crate::store::VectorStore;

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 4;

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// `embedder` must be the provider used at index time.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Up to `k` chunks most similar to `query`, best first.
    ///
    /// Returns an empty vector for a blank query, `k == 0`, an empty index,
    /// or any embedding/store failure.
    pub async fn retrieve_context(&self, query: &str, k: usize) -> Vec<RetrievedChunk> {
        if k == 0 || query.trim().is_empty() {
            return Vec::new();
        }

        let query_vec = match embed_query(self.embedder.as_ref(), query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "query embedding failed; answering without context");
                return Vec::new();
            }
        };

        let hits = match self.store.search(&query_vec, k).await {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "vector search failed; answering without context");
                return Vec::new();
            }
        };

        debug!(
            k,
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "retrieved context"
        );

        hits.into_iter()
            .map(|h| RetrievedChunk {
                chunk_id: h.chunk_id,
                text: h.text,
                metadata: h.metadata,
                score: h.score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunker;
    use crate::embedding::HashProvider;
    use crate::index::Indexer;
    use crate::models::ChunkMetadata;
    use crate::store::memory::InMemoryVectorStore;
    use anyhow::Result;
    use async_trait::async_trait;

    struct DownEmbedder;

    #[async_trait]
    impl EmbeddingProvider for DownEmbedder {
        fn model_name(&self) -> &str {
            "down"
        }
        fn dims(&self) -> usize {
            8
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("connection refused")
        }
    }

    fn setup() -> (Indexer, Retriever) {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashProvider::new(256));
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        (
            Indexer::new(Chunker::default(), embedder.clone(), store.clone()),
            Retriever::new(embedder, store),
        )
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let (_, retriever) = setup();
        assert!(retriever.retrieve_context("check-in time", 4).await.is_empty());
    }

    #[tokio::test]
    async fn test_returns_most_similar_first() {
        let (indexer, retriever) = setup();
        indexer
            .index("Check-in time starts at 2pm.", &ChunkMetadata::new("faq.pdf"))
            .await;
        indexer
            .index("The spa offers massages.", &ChunkMetadata::website())
            .await;

        let hits = retriever.retrieve_context("What is the check-in time?", 4).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Check-in time starts at 2pm.");
        assert_eq!(hits[0].metadata.source, "faq.pdf");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_k_limits_results() {
        let (indexer, retriever) = setup();
        for i in 0..6 {
            indexer
                .index(&format!("Fact number {}", i), &ChunkMetadata::website())
                .await;
        }
        assert_eq!(retriever.retrieve_context("fact", 4).await.len(), 4);
        assert!(retriever.retrieve_context("fact", 0).await.is_empty());
        assert!(retriever.retrieve_context("   ", 4).await.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_returns_empty() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let retriever = Retriever::new(Arc::new(DownEmbedder), store);
        assert!(retriever.retrieve_context("anything", 4).await.is_empty());
    }
}
