//! Service wiring.
//!
//! [`AppServices`] owns everything the HTTP server and the CLI need: the
//! chat pipeline, the ingestion service, and the SQLite-backed stores. External
//! collaborators are grouped in [`Collaborators`] so tests can substitute
//! fakes while keeping the real storage layer.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use support_harness_core::chunk::Chunker;
use support_harness_core::completion::CompletionProvider;
use support_harness_core::embedding::EmbeddingProvider;
use support_harness_core::escalation::EscalationEngine;
use support_harness_core::index::Indexer;
use support_harness_core::retrieve::Retriever;
use support_harness_core::store::VectorStore;

use crate::chat::ChatService;
use crate::checkpoint::SqliteCheckpointStore;
use crate::completion::create_completion_provider;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::embedding::create_provider;
use crate::ingest::IngestService;
use crate::notify::{create_notifier, Notifier};
use crate::records::{RecordStore, SqliteRecordStore};
use crate::scrape::{HttpPageFetcher, PageFetcher};
use crate::sessions::InMemorySessionStore;
use crate::sqlite_store::SqliteVectorStore;
use crate::{db, migrate};

/// External services the application talks to.
pub struct Collaborators {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub completion: Arc<dyn CompletionProvider>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            embedder: create_provider(&config.embedding)?,
            completion: create_completion_provider(&config.completion)?,
            fetcher: Arc::new(HttpPageFetcher::new(&config.website)?),
            notifier: create_notifier(&config.notify)?,
        })
    }
}

#[derive(Clone)]
pub struct AppServices {
    pub chat: Arc<ChatService>,
    pub ingest: Arc<IngestService>,
    pub records: Arc<dyn RecordStore>,
    pub vectors: Arc<SqliteVectorStore>,
}

impl AppServices {
    /// Connect, migrate, and build every service from `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let collaborators = Collaborators::from_config(config)?;
        Self::build(config, collaborators).await
    }

    pub async fn build(config: &Config, collaborators: Collaborators) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool)
            .await
            .context("Failed to apply database migrations")?;

        let vectors = Arc::new(SqliteVectorStore::new(pool.clone()));
        let store: Arc<dyn VectorStore> = vectors.clone();
        let records: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(pool.clone()));

        let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let indexer = Indexer::new(chunker, collaborators.embedder.clone(), store.clone())
            .with_batch_size(config.embedding.batch_size);
        let ingest = IngestService::new(
            indexer,
            collaborators.fetcher,
            Arc::new(SqliteCheckpointStore::new(pool.clone())),
            config.uploads.dir.clone(),
        );
        ingest.restore().await?;

        let dispatcher = Arc::new(Dispatcher::new(
            collaborators.completion.clone(),
            records.clone(),
            collaborators.notifier,
        ));
        let chat = ChatService::new(
            EscalationEngine::new(config.escalation.clone()),
            Arc::new(InMemorySessionStore::new()),
            Retriever::new(collaborators.embedder.clone(), store),
            collaborators.completion,
            dispatcher,
            config.assistant.business_name.clone(),
            config.retrieval.top_k,
        );

        info!(
            embedder = collaborators.embedder.model_name(),
            db = %config.db.path.display(),
            "services ready"
        );

        Ok(Self {
            chat: Arc::new(chat),
            ingest: Arc::new(ingest),
            records,
            vectors,
        })
    }
}
