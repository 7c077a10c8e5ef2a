//! Upload-to-index ingestion pipeline.
//!
//! `ingest` takes raw file bytes through validation, text extraction,
//! chunking, embedding, and a two-phase write: the chunk batch commits to the
//! index first, then the document record is written to the registry. The
//! registry record is the last thing written so its `chunk_count` is only
//! ever present once the chunks it counts are searchable.
//!
//! If phase two fails, the index and registry disagree for that filename.
//! The pipeline does not hide this: it logs at error level and returns
//! [`IngestError::RegistryWrite`], and `reconcile` reports the drift until a
//! re-upload or delete repairs it.
//!
//! Concurrent ingests of the same filename serialize on a per-filename lock;
//! without it, two uploads could interleave chunk batches for one source.

use crate::config::RagConfig;
use crate::error::IngestError;
use crate::index::EmbeddingIndex;
use crate::registry::{DocumentRecord, DocumentRegistry};
use crate::extract::extract_text;
use chorus_context::{TextSplitter, tag_chunks};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub filename: String,
    pub chunks_created: usize,
    pub file_size: u64,
}

/// Orchestrates uploads into the index and registry.
pub struct IngestionPipeline {
    index: EmbeddingIndex,
    registry: DocumentRegistry,
    splitter: TextSplitter,
    config: RagConfig,
    file_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IngestionPipeline {
    pub fn new(
        index: EmbeddingIndex,
        registry: DocumentRegistry,
        config: RagConfig,
    ) -> Result<Self, IngestError> {
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            index,
            registry,
            splitter,
            config,
            file_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    async fn lock_for(&self, filename: &str) -> Arc<Mutex<()>> {
        let mut locks = self.file_locks.lock().await;
        locks.entry(filename.to_string()).or_default().clone()
    }

    /// Ingests one uploaded file.
    ///
    /// Validates extension and size, extracts text, chunks and tags it,
    /// commits the batch to the index, then writes the document record.
    /// Re-uploading a filename replaces its previous chunks and record.
    pub async fn ingest(
        &self,
        file_bytes: &[u8],
        filename: &str,
    ) -> Result<IngestReport, IngestError> {
        let extension = RagConfig::extension_of(filename).unwrap_or_default();
        if !self.config.allows_extension(&extension) {
            return Err(IngestError::UnsupportedType {
                filename: filename.to_string(),
                extension,
                allowed: self.config.allowed_extensions.join(", "),
            });
        }

        let file_size = file_bytes.len() as u64;
        if file_size > self.config.max_file_size {
            return Err(IngestError::TooLarge {
                filename: filename.to_string(),
                size: file_size,
                limit: self.config.max_file_size,
            });
        }

        let lock = self.lock_for(filename).await;
        let _guard = lock.lock().await;

        let text = extract_text(file_bytes, &extension, filename)?;
        if text.trim().is_empty() {
            return Err(IngestError::EmptyDocument {
                filename: filename.to_string(),
            });
        }

        let chunks = tag_chunks(filename, self.splitter.split(&text));
        tracing::info!(
            filename,
            chunks = chunks.len(),
            file_size,
            "ingesting document"
        );

        // Replace semantics for re-uploads: clear the old chunks inside the
        // same lock so the source never holds two generations at once.
        self.index.delete_by_source(filename).await?;
        self.index.insert(&chunks).await?;

        let record = DocumentRecord {
            filename: filename.to_string(),
            upload_time: Utc::now(),
            chunk_count: chunks.len(),
            file_size,
        };
        if let Err(source) = self.registry.upsert(&record).await {
            tracing::error!(
                filename,
                chunks = chunks.len(),
                "document record write failed after chunk commit; index and registry disagree: {source}"
            );
            return Err(IngestError::RegistryWrite {
                filename: filename.to_string(),
                source,
            });
        }

        Ok(IngestReport {
            filename: filename.to_string(),
            chunks_created: record.chunk_count,
            file_size,
        })
    }

    /// Two-phase delete: chunks first, then the registry record. Idempotent;
    /// retrying after a partial failure finishes the remaining phase.
    pub async fn delete_document(&self, filename: &str) -> Result<u64, IngestError> {
        let lock = self.lock_for(filename).await;
        let _guard = lock.lock().await;

        let removed = self.index.delete_by_source(filename).await?;
        let had_record = self.registry.delete(filename).await?;

        tracing::info!(filename, removed, had_record, "deleted document");
        Ok(removed)
    }

    /// All registered documents, most recent first.
    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>, IngestError> {
        Ok(self.registry.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_embed::HashEmbedProvider;

    async fn test_pipeline(config: RagConfig) -> IngestionPipeline {
        let index = EmbeddingIndex::open_memory(Arc::new(HashEmbedProvider::default()))
            .await
            .unwrap();
        let registry = DocumentRegistry::open(index.pool().clone()).await.unwrap();
        IngestionPipeline::new(index, registry, config).unwrap()
    }

    fn base_config() -> RagConfig {
        RagConfig::new(".")
    }

    #[tokio::test]
    async fn ingest_writes_chunks_then_record() {
        let pipeline = test_pipeline(base_config()).await;
        let text = (0..60)
            .map(|i| format!("Sentence number {i} of the handbook. "))
            .collect::<String>();

        let report = pipeline.ingest(text.as_bytes(), "handbook.txt").await.unwrap();
        assert_eq!(report.filename, "handbook.txt");
        assert_eq!(report.file_size, text.len() as u64);
        assert!(report.chunks_created > 1);

        // Registry record matches the committed chunk count.
        let record = pipeline
            .registry()
            .get("handbook.txt")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.chunk_count, report.chunks_created);
        assert_eq!(
            pipeline.index().count_by_source("handbook.txt").await.unwrap(),
            report.chunks_created as u64
        );
    }

    #[tokio::test]
    async fn rejects_unsupported_extension() {
        let pipeline = test_pipeline(base_config()).await;
        let err = pipeline.ingest(b"binary", "tool.exe").await.unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedType { .. }));
    }

    #[tokio::test]
    async fn rejects_oversized_upload() {
        let pipeline = test_pipeline(base_config().with_max_file_size(16)).await;
        let err = pipeline
            .ingest(b"this is longer than sixteen bytes", "a.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn rejects_empty_document() {
        let pipeline = test_pipeline(base_config()).await;
        let err = pipeline.ingest(b"   \n\n  ", "blank.txt").await.unwrap_err();
        assert!(matches!(err, IngestError::EmptyDocument { .. }));
    }

    #[tokio::test]
    async fn reingest_replaces_previous_chunks() {
        let pipeline = test_pipeline(base_config()).await;
        let long = (0..60)
            .map(|i| format!("Original sentence {i} in the document. "))
            .collect::<String>();
        pipeline.ingest(long.as_bytes(), "doc.txt").await.unwrap();

        let report = pipeline
            .ingest(b"A much shorter replacement.", "doc.txt")
            .await
            .unwrap();
        assert_eq!(report.chunks_created, 1);
        assert_eq!(pipeline.index().count_by_source("doc.txt").await.unwrap(), 1);
        let record = pipeline.registry().get("doc.txt").await.unwrap().unwrap();
        assert_eq!(record.chunk_count, 1);
    }

    #[tokio::test]
    async fn delete_document_clears_both_stores() {
        let pipeline = test_pipeline(base_config()).await;
        pipeline
            .ingest(b"Some document body worth indexing.", "doc.txt")
            .await
            .unwrap();

        let removed = pipeline.delete_document("doc.txt").await.unwrap();
        assert_eq!(removed, 1);
        assert!(pipeline.registry().get("doc.txt").await.unwrap().is_none());
        assert_eq!(pipeline.index().count_by_source("doc.txt").await.unwrap(), 0);

        // Idempotent retry.
        assert_eq!(pipeline.delete_document("doc.txt").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_same_filename_ingests_serialize() {
        let pipeline = Arc::new(test_pipeline(base_config()).await);
        let text = (0..40)
            .map(|i| format!("Contending sentence {i} in the body. "))
            .collect::<String>();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pipeline = Arc::clone(&pipeline);
            let text = text.clone();
            handles.push(tokio::spawn(async move {
                pipeline.ingest(text.as_bytes(), "same.txt").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Serialized replacement: exactly one generation of chunks survives.
        let record = pipeline.registry().get("same.txt").await.unwrap().unwrap();
        assert_eq!(
            pipeline.index().count_by_source("same.txt").await.unwrap(),
            record.chunk_count as u64
        );
    }

    #[tokio::test]
    async fn list_documents_orders_recent_first() {
        let pipeline = test_pipeline(base_config()).await;
        pipeline.ingest(b"first document body", "one.txt").await.unwrap();
        pipeline.ingest(b"second document body", "two.txt").await.unwrap();

        let documents = pipeline.list_documents().await.unwrap();
        assert_eq!(documents.len(), 2);
        assert!(documents[0].upload_time >= documents[1].upload_time);
    }
}
