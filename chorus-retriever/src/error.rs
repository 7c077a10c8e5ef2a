//! Error types for the retrieval pipeline.
//!
//! Two taxonomies with different propagation rules:
//!
//! - [`IndexError`]: faults in the vector store itself. `Unavailable` is
//!   fatal at startup; the service must not claim readiness without an open
//!   index.
//! - [`IngestError`]: upload-time failures. These are surfaced verbatim to
//!   the caller with enough detail to fix the input.
//!
//! Query-time retrieval faults are deliberately absent here: similarity
//! search absorbs them into empty results (logged and counted) because a
//! grounding failure must degrade answer quality, never availability.

use thiserror::Error;

/// Faults in the underlying vector store.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The store could not be opened at startup. Fatal: nothing downstream
    /// can work without it.
    #[error("index unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// A query against an open store failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedding generation failed while writing chunks.
    #[error("embedding failed: {0}")]
    Embedding(#[from] chorus_embed::EmbedError),
}

/// Upload-time failures, surfaced to the caller.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The file extension is not in the configured allow-list.
    #[error("unsupported file type {extension:?} for {filename} (allowed: {allowed})")]
    UnsupportedType {
        filename: String,
        extension: String,
        allowed: String,
    },

    /// The upload exceeds the configured size ceiling.
    #[error("{filename} is too large: {size} bytes (limit {limit})")]
    TooLarge {
        filename: String,
        size: u64,
        limit: u64,
    },

    /// The file content could not be decoded into text.
    #[error("failed to extract text from {filename}: {message}")]
    Extraction { filename: String, message: String },

    /// Extraction succeeded but produced nothing worth indexing.
    #[error("no indexable text in {filename}")]
    EmptyDocument { filename: String },

    /// Invalid chunking parameters.
    #[error(transparent)]
    Splitter(#[from] chorus_context::SplitterError),

    /// The vector store rejected the chunk batch.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Chunks were committed to the index but the document record write
    /// failed afterwards. The index and registry now disagree about
    /// `filename`; a reconcile pass will surface the drift.
    #[error("document record write failed for {filename} after its chunks were committed")]
    RegistryWrite {
        filename: String,
        #[source]
        source: sqlx::Error,
    },
}
