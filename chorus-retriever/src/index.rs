//! SQLite-backed vector index for document chunks.
//!
//! This module is the data layer of the pipeline: it stores chunk text with
//! provenance metadata and an f16 embedding blob per row, and answers cosine
//! similarity queries over the stored vectors.
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE chunks (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,  -- internal, never exposed
//!     source TEXT,                           -- originating filename
//!     chunk_index INTEGER,                   -- 0-indexed position in document
//!     total_chunks INTEGER,                  -- chunks produced from document
//!     content TEXT,                          -- chunk text
//!     embedding BLOB,                        -- f16 vector, little-endian
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//! ```
//!
//! ## SQLite Configuration
//!
//! - **WAL mode**: reads proceed concurrently with unrelated writes
//! - **Large page size** (64KB): sized for embedding blob storage
//! - **Busy timeout**: writers queue instead of failing under contention
//!
//! ## Failure policy
//!
//! `insert` and `delete_by_source` surface errors: they run on the ingestion
//! path where the caller can act on them. `search` never errors: a retrieval
//! fault at conversation time is logged, counted, and absorbed into an empty
//! result so the turn can proceed ungrounded.

use crate::error::IndexError;
use chorus_context::Chunk;
use chorus_embed::EmbeddingProvider;
use half::f16;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Provenance of a retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A single similarity hit. Ephemeral: produced per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub similarity_score: f32,
}

/// Aggregate counts over the index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub chunks_count: usize,
    pub embedded_count: usize,
    pub sources_count: usize,
    /// Searches absorbed into empty results since startup.
    pub search_errors: u64,
}

/// SQLite-backed embedding index.
///
/// Cloning is cheap and shares the connection pool, the embedding provider,
/// and the error counter; the index is intended to be process-wide shared
/// state.
#[derive(Clone)]
pub struct EmbeddingIndex {
    pool: SqlitePool,
    provider: Arc<dyn EmbeddingProvider>,
    search_errors: Arc<AtomicU64>,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

impl EmbeddingIndex {
    /// Opens (creating if missing) the index database under `base_dir`.
    ///
    /// Any failure here is [`IndexError::Unavailable`]: the caller must treat
    /// it as fatal rather than starting a service that cannot ground answers.
    pub async fn open(
        db_path: &Path,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, IndexError> {
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .create_if_missing(true)
                .page_size(1 << 16),
        )
        .await
        .map_err(IndexError::Unavailable)?;

        Self::new_with_pool(pool, provider).await
    }

    /// Opens an in-memory index for testing.
    pub async fn open_memory(provider: Arc<dyn EmbeddingProvider>) -> Result<Self, IndexError> {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .map_err(IndexError::Unavailable)?;
        Self::new_with_pool(pool, provider).await
    }

    async fn new_with_pool(
        pool: SqlitePool,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, IndexError> {
        Self::create_tables(&pool)
            .await
            .map_err(IndexError::Unavailable)?;

        Ok(Self {
            pool,
            provider,
            search_errors: Arc::new(AtomicU64::new(0)),
        })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// The embedding provider backing this index.
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// The underlying SQLite connection pool, shared with the document
    /// registry.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Embeds and stores a batch of chunks in a single transaction.
    ///
    /// Chunks are searchable as soon as this returns. Embedding failures
    /// surface here (this is the ingestion path, the caller can retry or
    /// reject the upload).
    pub async fn insert(&self, chunks: &[Chunk]) -> Result<(), IndexError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.provider.embed_texts(&texts).await?;

        let mut tx = self.pool.begin().await?;
        for (chunk, embedding) in chunks.iter().zip(embeddings.embeddings.iter()) {
            let embedding_bytes = bytemuck::cast_slice::<f16, u8>(embedding);

            sqlx::query(
                r#"
                INSERT INTO chunks (source, chunk_index, total_chunks, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&chunk.source)
            .bind(chunk.chunk_index as i64)
            .bind(chunk.total_chunks as i64)
            .bind(&chunk.text)
            .bind(embedding_bytes)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(
            chunks = chunks.len(),
            source = %chunks[0].source,
            "committed chunk batch"
        );
        Ok(())
    }

    /// Cosine similarity search over all stored chunks.
    ///
    /// Results are ordered by descending similarity; equal scores keep
    /// insertion order (rows are scanned in id order and the sort is stable).
    /// Never errors: an empty index yields an empty result, and any embedding
    /// or database fault is logged, counted, and absorbed into an empty
    /// result.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<RetrievalResult> {
        match self.search_inner(query, top_k).await {
            Ok(results) => results,
            Err(error) => {
                self.search_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!("similarity search failed, returning no results: {error}");
                Vec::new()
            }
        }
    }

    async fn search_inner(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, IndexError> {
        let query_embedding = self.provider.embed_text(query).await?;

        let rows = sqlx::query(
            "SELECT source, chunk_index, total_chunks, content, embedding
             FROM chunks WHERE embedding IS NOT NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, RetrievalResult)> = Vec::with_capacity(rows.len());
        for row in rows {
            let source: String = row.get("source");
            let chunk_index: i64 = row.get("chunk_index");
            let total_chunks: i64 = row.get("total_chunks");
            let content: String = row.get("content");
            let embedding_bytes: Vec<u8> = row.get("embedding");

            let chunk_embedding = bytemuck::cast_slice::<u8, f16>(&embedding_bytes);
            let similarity = cosine_similarity(&query_embedding, chunk_embedding);

            scored.push((
                similarity,
                RetrievalResult {
                    content,
                    metadata: ChunkMetadata {
                        source,
                        chunk_index: chunk_index as usize,
                        total_chunks: total_chunks as usize,
                    },
                    similarity_score: similarity,
                },
            ));
        }

        // Stable sort: ties stay in id (insertion) order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored.into_iter().map(|(_, result)| result).collect())
    }

    /// Deletes every chunk tagged with `source` in one statement, so a search
    /// started after the delete commits sees none of them. Returns the number
    /// removed; 0 when nothing matched.
    pub async fn delete_by_source(&self, source: &str) -> Result<u64, IndexError> {
        let result = sqlx::query("DELETE FROM chunks WHERE source = ?1")
            .bind(source)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        tracing::debug!(source, removed, "deleted chunks by source");
        Ok(removed)
    }

    /// Number of chunks tagged with `source`.
    pub async fn count_by_source(&self, source: &str) -> Result<u64, IndexError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE source = ?1")
            .bind(source)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Chunk counts grouped by source, for the reconciliation check.
    pub async fn chunk_counts_by_source(&self) -> Result<Vec<(String, u64)>, IndexError> {
        let rows =
            sqlx::query("SELECT source, COUNT(*) AS n FROM chunks GROUP BY source ORDER BY source")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let source: String = row.get("source");
                let count: i64 = row.get("n");
                (source, count as u64)
            })
            .collect())
    }

    /// Aggregate statistics over the index.
    pub async fn stats(&self) -> Result<IndexStats, IndexError> {
        let chunks_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let embedded_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        let sources_count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT source) FROM chunks")
            .fetch_one(&self.pool)
            .await?;

        Ok(IndexStats {
            chunks_count: chunks_count as usize,
            embedded_count: embedded_count as usize,
            sources_count: sources_count as usize,
            search_errors: self.search_errors.load(Ordering::Relaxed),
        })
    }
}

/// Cosine similarity between two f16 embedding vectors.
fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f32::from(*x) * f32::from(*y))
        .sum();

    let norm_a: f32 = a.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_context::tag_chunks;
    use chorus_embed::HashEmbedProvider;

    async fn test_index() -> EmbeddingIndex {
        EmbeddingIndex::open_memory(Arc::new(HashEmbedProvider::default()))
            .await
            .unwrap()
    }

    fn chunks_from(source: &str, texts: &[&str]) -> Vec<Chunk> {
        tag_chunks(source, texts.iter().map(|t| t.to_string()).collect())
    }

    #[tokio::test]
    async fn exact_text_ranks_first_with_maximal_score() {
        let index = test_index().await;
        index
            .insert(&chunks_from(
                "faq.txt",
                &[
                    "returns are accepted within thirty days of purchase",
                    "shipping takes five to seven business days",
                    "gift cards never expire and are not refundable",
                ],
            ))
            .await
            .unwrap();

        let results = index
            .search("shipping takes five to seven business days", 3)
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].content,
            "shipping takes five to seven business days"
        );
        assert_eq!(results[0].metadata.chunk_index, 1);
        assert!((results[0].similarity_score - 1.0).abs() < 0.01);
        assert!(results[0].similarity_score >= results[1].similarity_score);
        assert!(results[1].similarity_score >= results[2].similarity_score);
    }

    #[tokio::test]
    async fn empty_index_returns_empty_not_error() {
        let index = test_index().await;
        assert!(index.search("anything at all", 5).await.is_empty());
    }

    #[tokio::test]
    async fn search_respects_top_k() {
        let index = test_index().await;
        let texts: Vec<String> = (0..10).map(|i| format!("document text number {i}")).collect();
        index
            .insert(&tag_chunks("many.txt", texts))
            .await
            .unwrap();

        assert_eq!(index.search("document text", 4).await.len(), 4);
    }

    #[tokio::test]
    async fn delete_by_source_empties_and_is_idempotent() {
        let index = test_index().await;
        index
            .insert(&chunks_from("a.txt", &["alpha content", "beta content"]))
            .await
            .unwrap();

        let removed = index.delete_by_source("a.txt").await.unwrap();
        assert_eq!(removed, 2);
        assert!(index.search("alpha content", 5).await.is_empty());

        // Second delete finds nothing and raises no error.
        let removed_again = index.delete_by_source("a.txt").await.unwrap();
        assert_eq!(removed_again, 0);
    }

    #[tokio::test]
    async fn delete_missing_source_returns_zero() {
        let index = test_index().await;
        assert_eq!(index.delete_by_source("nope.txt").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_scoped_to_one_source() {
        let index = test_index().await;
        index
            .insert(&chunks_from("keep.txt", &["keep this content"]))
            .await
            .unwrap();
        index
            .insert(&chunks_from("drop.txt", &["drop this content"]))
            .await
            .unwrap();

        index.delete_by_source("drop.txt").await.unwrap();

        assert_eq!(index.count_by_source("keep.txt").await.unwrap(), 1);
        assert_eq!(index.count_by_source("drop.txt").await.unwrap(), 0);
        let results = index.search("keep this content", 5).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.source, "keep.txt");
    }

    #[tokio::test]
    async fn stats_track_counts() {
        let index = test_index().await;
        index
            .insert(&chunks_from("a.txt", &["one", "two"]))
            .await
            .unwrap();
        index
            .insert(&chunks_from("b.txt", &["three"]))
            .await
            .unwrap();

        let stats = index.stats().await.unwrap();
        assert_eq!(stats.chunks_count, 3);
        assert_eq!(stats.embedded_count, 3);
        assert_eq!(stats.sources_count, 2);
        assert_eq!(stats.search_errors, 0);
    }

    #[test]
    fn cosine_similarity_basics() {
        let a = vec![f16::from_f32(1.0), f16::from_f32(0.0)];
        let b = vec![f16::from_f32(0.0), f16::from_f32(1.0)];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.01);
        assert!(cosine_similarity(&a, &b).abs() < 0.01);
        // Mismatched dimensions are defined as zero similarity.
        assert_eq!(cosine_similarity(&a, &[f16::from_f32(1.0)]), 0.0);
    }
}
