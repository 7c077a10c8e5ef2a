//! # chorus-retriever
//!
//! Document ingestion, vector indexing, and similarity retrieval for a
//! conversational agent grounded in private documents.
//!
//! ## Architecture
//!
//! ```text
//!  upload (bytes, filename)                conversation turn
//!           |                                      |
//!           v                                      v
//!   IngestionPipeline                       RetrievalService
//!     validate / extract                      search + format
//!           |                                      |
//!           v                                      v
//!     TextSplitter ----> EmbeddingIndex <----------+
//!     (chorus-context)    (SQLite + f16 vectors)
//!           |                   |
//!           +--> DocumentRegistry (written after chunk commit)
//! ```
//!
//! Writes are two-phase: chunks commit to the [`index::EmbeddingIndex`]
//! first, then the [`registry::DocumentRegistry`] record. The [`reconcile`]
//! module reports any drift between the two.
//!
//! All components are constructed explicitly at startup from a
//! [`config::RagConfig`]; there is no global state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chorus_embed::HashEmbedProvider;
//! use chorus_retriever::{
//!     DocumentRegistry, EmbeddingIndex, IngestionPipeline, RagConfig, RetrievalService,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RagConfig::new(".");
//! let index = EmbeddingIndex::open(
//!     &config.db_path(),
//!     Arc::new(HashEmbedProvider::default()),
//! )
//! .await?;
//! let registry = DocumentRegistry::open(index.pool().clone()).await?;
//! let pipeline = IngestionPipeline::new(index.clone(), registry, config.clone())?;
//!
//! pipeline.ingest(b"The refund window is 30 days.", "policy.txt").await?;
//!
//! let service = RetrievalService::new(index, config.top_k);
//! let results = service.retrieve("refund window", None).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod reconcile;
pub mod registry;
pub mod retrieve;

pub use config::RagConfig;
pub use error::{IndexError, IngestError};
pub use index::{ChunkMetadata, EmbeddingIndex, IndexStats, RetrievalResult};
pub use ingest::{IngestReport, IngestionPipeline};
pub use reconcile::{ConsistencyReport, ConsistencyStatus, check_consistency};
pub use registry::{DocumentRecord, DocumentRegistry};
pub use retrieve::{NO_CONTEXT_SENTINEL, RetrievalService};
