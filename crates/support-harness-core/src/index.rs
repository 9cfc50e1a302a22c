//! Chunk, embed, and store source text.
//!
//! [`Indexer::index`] is the single write path into the vector store. It
//! never fails as a whole: embedding or insert failures are logged and
//! counted in the returned [`IndexReport`], and chunks inserted before a
//! failure stay in the store.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::chunk::Chunker;
use crate::embedding::EmbeddingProvider;
use crate::models::ChunkMetadata;
use crate::store::VectorStore;

/// Default number of chunks embedded per provider call.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Outcome of one [`Indexer::index`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Chunks produced by the chunker.
    pub chunks: usize,
    /// Chunks embedded and written to the store.
    pub inserted: usize,
    /// Chunks lost to embedding or store errors.
    pub failed: usize,
}

pub struct Indexer {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl Indexer {
    pub fn new(
        chunker: Chunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }


    /// Chunk `text`, embed the chunks, and insert them tagged with `metadata`.
    ///
    /// Blank text is a no-op.
    pub async fn index(&self, text: &str, metadata: &ChunkMetadata) -> IndexReport {
        let mut report = IndexReport::default();
        if text.trim().is_empty() {
            return report;
        }

        let chunks = self.chunker.chunk(text, metadata);
        report.chunks = chunks.len();
        let model = self.embedder.model_name().to_string();

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = match self.embedder.embed(&texts).await {
                Ok(v) if v.len() == batch.len() => v,
                Ok(v) => {
                    warn!(
                        source = %metadata.source,
                        expected = batch.len(),
                        got = v.len(),
                        "embedding provider returned wrong number of vectors"
                    );
                    report.failed += batch.len();
                    continue;
                }
                Err(e) => {
                    warn!(source = %metadata.source, error = %e, "embedding batch failed");
                    report.failed += batch.len();
                    continue;
                }
            };

            for (chunk, vector) in batch.iter().zip(vectors.iter()) {
                match self.store.insert(chunk, vector, &model).await {
                    Ok(()) => report.inserted += 1,
                    Err(e) => {
                        warn!(chunk_id = %chunk.id, error = %e, "chunk insert failed");
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            source = %metadata.source,
            chunks = report.chunks,
            inserted = report.inserted,
            failed = report.failed,
            "indexed source"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashProvider;
    use crate::models::Chunk;
    use crate::store::memory::InMemoryVectorStore;
    use crate::store::ScoredChunk;
    use anyhow::Result;
    use async_trait::async_trait;

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("provider offline")
        }
    }

    /// Fails every insert after the first `ok` ones.
    struct FlakyStore {
        inner: InMemoryVectorStore,
        ok: usize,
        seen: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        async fn insert(&self, chunk: &Chunk, vector: &[f32], model: &str) -> Result<()> {
            let n = self.seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n >= self.ok {
                anyhow::bail!("disk full");
            }
            self.inner.insert(chunk, vector, model).await
        }
        async fn search(&self, q: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
            self.inner.search(q, k).await
        }
        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }
    }

    fn long_text() -> String {
        (0..200).map(|i| format!("w{:04} ", i)).collect()
    }

    #[tokio::test]
    async fn test_blank_text_is_noop() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = Indexer::new(Chunker::default(), Arc::new(HashProvider::new(32)), store.clone());
        let report = indexer.index("   \n ", &ChunkMetadata::website()).await;
        assert_eq!(report, IndexReport::default());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_indexes_all_chunks() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = Indexer::new(Chunker::default(), Arc::new(HashProvider::new(32)), store.clone())
            .with_batch_size(2);
        let report = indexer.index(&long_text(), &ChunkMetadata::website()).await;
        assert_eq!(report.chunks, 3);
        assert_eq!(report.inserted, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_identical_content_twice_is_not_deduplicated() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = Indexer::new(Chunker::default(), Arc::new(HashProvider::new(32)), store.clone());
        indexer.index("Free parking.", &ChunkMetadata::new("a.pdf")).await;
        indexer.index("Free parking.", &ChunkMetadata::new("a.pdf")).await;
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_counted_not_raised() {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = Indexer::new(Chunker::default(), Arc::new(FailingEmbedder), store.clone());
        let report = indexer.index(&long_text(), &ChunkMetadata::website()).await;
        assert_eq!(report.inserted, 0);
        assert_eq!(report.failed, 3);
    }

    #[tokio::test]
    async fn test_partial_insert_failure_keeps_earlier_chunks() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryVectorStore::new(),
            ok: 1,
            seen: Default::default(),
        });
        let indexer = Indexer::new(Chunker::default(), Arc::new(HashProvider::new(32)), store.clone());
        let report = indexer.index(&long_text(), &ChunkMetadata::website()).await;
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
