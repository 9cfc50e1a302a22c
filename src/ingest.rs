//! Knowledge-base ingestion: raw text, website refresh, and PDF uploads.
//!
//! Every path normalizes text before indexing. Only the website refresh is
//! gated by the change detector; text and PDF ingestion always index.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use support_harness_core::fingerprint::{Fingerprint, FingerprintState};
use support_harness_core::index::{IndexReport, Indexer};
use support_harness_core::models::{ChunkMetadata, WEBSITE_SOURCE};
use support_harness_core::normalize::normalize_text;

use crate::checkpoint::CheckpointStore;
use crate::extract::{extract_pdf_text, is_pdf_filename};
use crate::scrape::PageFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Success,
    Error,
    Updated,
    Unchanged,
}

/// Result of an ingestion request, returned as `{"status", "message"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub status: IngestStatus,
    pub message: String,
}

impl IngestOutcome {
    fn new(status: IngestStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == IngestStatus::Error
    }
}

fn indexed_message(what: &str, report: &IndexReport) -> String {
    if report.failed > 0 {
        format!(
            "{} indexed ({} of {} chunks stored).",
            what, report.inserted, report.chunks
        )
    } else {
        format!("{} indexed.", what)
    }
}

/// Chunks were produced but none reached the store.
fn nothing_stored(report: &IndexReport) -> bool {
    report.chunks > 0 && report.inserted == 0
}

pub struct IngestService {
    indexer: Indexer,
    fetcher: Arc<dyn PageFetcher>,
    checkpoints: Arc<dyn CheckpointStore>,
    fingerprint: Mutex<FingerprintState>,
    uploads_dir: Option<PathBuf>,
}

impl IngestService {
    pub fn new(
        indexer: Indexer,
        fetcher: Arc<dyn PageFetcher>,
        checkpoints: Arc<dyn CheckpointStore>,
        uploads_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            indexer,
            fetcher,
            checkpoints,
            fingerprint: Mutex::new(FingerprintState::new()),
            uploads_dir,
        }
    }

    /// Load the last committed website fingerprint from the checkpoint store.
    pub async fn restore(&self) -> anyhow::Result<()> {
        if let Some(hex) = self.checkpoints.load(WEBSITE_SOURCE).await? {
            *self.fingerprint.lock().await = FingerprintState::restored(Fingerprint::from_hex(hex));
        }
        Ok(())
    }

    pub async fn fingerprint(&self) -> FingerprintState {
        self.fingerprint.lock().await.clone()
    }

    /// Normalize and index `text` under `source`.
    pub async fn ingest_text(&self, text: &str, source: &str) -> IngestOutcome {
        let source = source.trim();
        if source.is_empty() {
            return IngestOutcome::new(IngestStatus::Error, "source must not be empty.");
        }
        let text = match normalize_text(text) {
            Ok(t) => t,
            Err(_) => return IngestOutcome::new(IngestStatus::Error, "No text to ingest."),
        };
        let report = self.indexer.index(&text, &ChunkMetadata::new(source)).await;
        if nothing_stored(&report) {
            return IngestOutcome::new(
                IngestStatus::Error,
                format!("{} could not be indexed.", source),
            );
        }
        IngestOutcome::new(IngestStatus::Success, indexed_message(source, &report))
    }

    /// Re-scrape the website and index it only when its text changed.
    ///
    /// Concurrent refreshes serialize on the fingerprint lock, so unchanged
    /// text is indexed at most once.
    pub async fn refresh_website(&self) -> IngestOutcome {
        let raw = match self.fetcher.fetch().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "website fetch failed");
                return IngestOutcome::new(
                    IngestStatus::Error,
                    format!("Failed to fetch website: {}", e),
                );
            }
        };
        let text = match normalize_text(&raw) {
            Ok(t) => t,
            Err(_) => {
                return IngestOutcome::new(IngestStatus::Error, "Website returned no text.");
            }
        };

        let mut state = self.fingerprint.lock().await;
        let (fingerprint, changed) = state.check(&text);
        if !changed {
            info!(fingerprint = %fingerprint, "website unchanged");
            return IngestOutcome::new(IngestStatus::Unchanged, "No changes detected on website.");
        }

        let report = self.indexer.index(&text, &ChunkMetadata::website()).await;
        if nothing_stored(&report) {
            return IngestOutcome::new(
                IngestStatus::Error,
                "Website changed but no content could be indexed.",
            );
        }

        if let Err(e) = self.checkpoints.save(WEBSITE_SOURCE, fingerprint.as_str()).await {
            error!(error = %e, "failed to persist website fingerprint");
        }
        state.commit(fingerprint);
        info!(version = state.version(), chunks = report.inserted, "website re-indexed");
        IngestOutcome::new(IngestStatus::Updated, "Website changed and content indexed.")
    }

    /// Extract and index an uploaded PDF. Always indexes; no change detection.
    pub async fn ingest_upload(&self, filename: &str, bytes: &[u8]) -> IngestOutcome {
        let filename = sanitize_filename(filename);
        if filename.is_empty() || !is_pdf_filename(&filename) {
            return IngestOutcome::new(IngestStatus::Error, "Only PDF files are supported.");
        }

        if let Some(dir) = &self.uploads_dir {
            if let Err(e) = save_upload(dir, &filename, bytes).await {
                warn!(filename = %filename, error = %e, "failed to keep uploaded file");
            }
        }

        let owned = bytes.to_vec();
        let extracted = tokio::task::spawn_blocking(move || extract_pdf_text(&owned)).await;
        let text = match extracted {
            Ok(Ok(raw)) => match normalize_text(&raw) {
                Ok(t) => t,
                Err(_) => {
                    return IngestOutcome::new(IngestStatus::Error, "Failed to extract text from PDF.")
                }
            },
            Ok(Err(e)) => {
                warn!(filename = %filename, error = %e, "PDF extraction failed");
                return IngestOutcome::new(IngestStatus::Error, "Failed to extract text from PDF.");
            }
            Err(e) => {
                error!(filename = %filename, error = %e, "PDF extraction task failed");
                return IngestOutcome::new(IngestStatus::Error, "Failed to extract text from PDF.");
            }
        };

        let report = self.indexer.index(&text, &ChunkMetadata::new(filename.as_str())).await;
        if nothing_stored(&report) {
            return IngestOutcome::new(
                IngestStatus::Error,
                format!("{} could not be indexed.", filename),
            );
        }
        IngestOutcome::new(
            IngestStatus::Success,
            format!("{} uploaded and indexed.", filename),
        )
    }
}

/// Final path component of a client-supplied filename.
fn sanitize_filename(filename: &str) -> String {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

async fn save_upload(dir: &std::path::Path, filename: &str, bytes: &[u8]) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(filename), bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::InMemoryCheckpointStore;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use support_harness_core::chunk::Chunker;
    use support_harness_core::embedding::{EmbeddingProvider, HashProvider};
    use support_harness_core::store::memory::InMemoryVectorStore;
    use support_harness_core::store::VectorStore;

    struct StaticFetcher(Option<&'static str>);

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self) -> Result<String> {
            match self.0 {
                Some(text) => Ok(text.to_string()),
                None => bail!("connection refused"),
            }
        }
    }

    struct OfflineEmbedder;

    #[async_trait]
    impl EmbeddingProvider for OfflineEmbedder {
        fn model_name(&self) -> &str {
            "offline"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            bail!("embedding backend unreachable")
        }
    }

    const PAGE: &str = "Day rooms from 9am.";

    fn service_with(
        fetcher: StaticFetcher,
        embedder: Arc<dyn EmbeddingProvider>,
        checkpoints: Arc<InMemoryCheckpointStore>,
    ) -> (IngestService, Arc<InMemoryVectorStore>) {
        let store = Arc::new(InMemoryVectorStore::new());
        let indexer = Indexer::new(Chunker::default(), embedder, store.clone());
        let svc = IngestService::new(indexer, Arc::new(fetcher), checkpoints, None);
        (svc, store)
    }

    fn service(fetcher: StaticFetcher) -> (IngestService, Arc<InMemoryVectorStore>) {
        service_with(
            fetcher,
            Arc::new(HashProvider::new(64)),
            Arc::new(InMemoryCheckpointStore::new()),
        )
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&IngestOutcome::new(IngestStatus::Unchanged, "x")).unwrap();
        assert_eq!(json, r#"{"status":"unchanged","message":"x"}"#);
    }

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/rates.pdf"), "rates.pdf");
        assert_eq!(sanitize_filename("C:\\tmp\\menu.PDF"), "menu.PDF");
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let (svc, store) = service(StaticFetcher(None));
        let out = svc.ingest_text(" \n\t ", "faq").await;
        assert!(out.is_error());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_error_outcome() {
        let (svc, _) = service(StaticFetcher(None));
        let out = svc.refresh_website().await;
        assert!(out.is_error());
        assert_eq!(svc.fingerprint().await.version(), 0);
    }

    #[tokio::test]
    async fn test_non_pdf_upload_rejected() {
        let (svc, store) = service(StaticFetcher(None));
        let out = svc.ingest_upload("notes.txt", b"hello").await;
        assert_eq!(out.message, "Only PDF files are supported.");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_reports_extraction_failure() {
        let (svc, _) = service(StaticFetcher(None));
        let out = svc.ingest_upload("broken.pdf", b"not a pdf").await;
        assert_eq!(out.message, "Failed to extract text from PDF.");
    }

    #[tokio::test]
    async fn test_text_that_cannot_be_embedded_is_an_error() {
        let (svc, store) = service_with(
            StaticFetcher(None),
            Arc::new(OfflineEmbedder),
            Arc::new(InMemoryCheckpointStore::new()),
        );
        let out = svc.ingest_text("Free parking for guests.", "faq").await;
        assert!(out.is_error());
        assert_eq!(out.message, "faq could not be indexed.");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_restored_fingerprint_skips_unchanged_website() {
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let previous = Fingerprint::of(&normalize_text(PAGE).unwrap());
        checkpoints
            .save(WEBSITE_SOURCE, previous.as_str())
            .await
            .unwrap();
        let (svc, store) = service_with(
            StaticFetcher(Some(PAGE)),
            Arc::new(HashProvider::new(64)),
            checkpoints,
        );

        svc.restore().await.unwrap();
        assert_eq!(svc.fingerprint().await.version(), 1);

        let out = svc.refresh_website().await;
        assert_eq!(out.status, IngestStatus::Unchanged);
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(svc.fingerprint().await.version(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_index_once() {
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let (svc, store) = service_with(
            StaticFetcher(Some(PAGE)),
            Arc::new(HashProvider::new(64)),
            checkpoints.clone(),
        );

        let (a, b) = tokio::join!(svc.refresh_website(), svc.refresh_website());
        let mut statuses = [a.status, b.status];
        statuses.sort_by_key(|s| *s == IngestStatus::Unchanged);
        assert_eq!(statuses, [IngestStatus::Updated, IngestStatus::Unchanged]);

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(svc.fingerprint().await.version(), 1);
        assert_eq!(
            checkpoints.load(WEBSITE_SOURCE).await.unwrap().as_deref(),
            Some(Fingerprint::of(&normalize_text(PAGE).unwrap()).as_str())
        );
    }
}
