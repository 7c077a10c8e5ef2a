pub mod splitter;

// Re-export the main splitting types for external use
pub use splitter::{Chunk, DOCUMENT_DELIMITERS, SplitterError, TextSplitter, tag_chunks};
