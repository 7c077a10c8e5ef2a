//! Immutable pipeline configuration, resolved once at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the whole retrieval pipeline: chunking parameters,
/// search defaults, upload limits, and the index location.
///
/// Resolved once when the process starts and passed by reference into each
/// component. Nothing reads the environment after construction.
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Directory holding the SQLite database file.
    pub base_dir: PathBuf,
    /// Maximum chunk size in bytes.
    pub chunk_size: usize,
    /// Overlap carried between consecutive chunks, in bytes.
    pub chunk_overlap: usize,
    /// Default number of results returned per similarity query.
    pub top_k: usize,
    /// Deadline for a retrieval call made on the conversational turn path.
    pub retrieval_timeout: Duration,
    /// Upload size ceiling in bytes.
    pub max_file_size: u64,
    /// Lowercase file extensions accepted for ingestion.
    pub allowed_extensions: Vec<String>,
}

impl RagConfig {
    /// Database filename created under [`base_dir`](Self::base_dir).
    pub const DB_FILENAME: &'static str = "chorus.db";

    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 3,
            retrieval_timeout: Duration::from_secs(10),
            max_file_size: 10 * 1024 * 1024,
            allowed_extensions: vec!["txt".to_string(), "md".to_string(), "pdf".to_string()],
        }
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_retrieval_timeout(mut self, timeout: Duration) -> Self {
        self.retrieval_timeout = timeout;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = extensions;
        self
    }

    /// Full path of the database file.
    pub fn db_path(&self) -> PathBuf {
        self.base_dir.join(Self::DB_FILENAME)
    }

    /// Whether `extension` (lowercase, without the dot) is accepted.
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.iter().any(|e| e == extension)
    }

    /// Extension of `filename`, lowercased, if it has one.
    pub fn extension_of(filename: &str) -> Option<String> {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }
}
