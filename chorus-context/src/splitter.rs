//! Overlapping, boundary-aware text splitting for retrieval pipelines.
//!
//! Uploaded documents are split into windows of at most `chunk_size` bytes,
//! where each window after the first begins `chunk_size - chunk_overlap` into
//! the previous one. Window ends are snapped to the most significant nearby
//! boundary (paragraph break, then sentence end, then line break, then
//! whitespace) so chunks read as coherent passages rather than mid-word cuts.
//!
//! Splitting is deterministic: the same text and parameters always produce
//! the same chunk sequence.
//!
//! ```
//! use chorus_context::TextSplitter;
//!
//! let splitter = TextSplitter::new(500, 100).unwrap();
//! let pieces = splitter.split("A short document.");
//! assert_eq!(pieces, vec!["A short document.".to_string()]);
//! ```
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

/// Boundary patterns for prose documents, ordered from most significant to
/// least. When a window end has to move back from its byte limit, the first
/// pattern with a match inside the window wins.
///
/// - `\n\n`: paragraph breaks
/// - `(?m)^#{1,6}\s`: Markdown headings starting a line
/// - `[.!?]["')\]]*\s`: sentence ends, tolerating closing quotes/brackets
/// - `\n`: line breaks
/// - `\s`: any whitespace
pub const DOCUMENT_DELIMITERS: &[&str] = &[
    r"\n\n",
    r"(?m)^#{1,6}\s",
    r#"[.!?]["')\]]*\s"#,
    r"\n",
    r"\s",
];

/// Errors raised while constructing a [`TextSplitter`].
#[derive(Debug, Error)]
pub enum SplitterError {
    /// `chunk_size` must be strictly greater than `chunk_overlap`.
    #[error("invalid window: chunk_size ({size}) must exceed chunk_overlap ({overlap})")]
    InvalidWindow { size: usize, overlap: usize },

    /// A custom delimiter pattern failed to compile.
    #[error("invalid delimiter pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A bounded text segment tagged with its source document and position.
/// Immutable once created; the index assigns identity after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk's text content.
    pub text: String,
    /// Filename of the document this chunk came from.
    pub source: String,
    /// 0-indexed position of this chunk within its document.
    pub chunk_index: usize,
    /// Total number of chunks produced from the document.
    pub total_chunks: usize,
}

/// Splits document text into overlapping windows.
///
/// Windows are at most `chunk_size` bytes, advance by
/// `chunk_size - chunk_overlap` relative to the previous window's realized
/// end, and snap their ends to the highest-priority boundary found in the
/// trailing half of the window.
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    delimiters: Vec<Regex>,
}

impl TextSplitter {
    /// Creates a splitter with the default prose delimiters.
    ///
    /// Fails with [`SplitterError::InvalidWindow`] unless
    /// `chunk_size > chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, SplitterError> {
        Self::with_delimiters(chunk_size, chunk_overlap, DOCUMENT_DELIMITERS)
    }

    /// Creates a splitter with custom boundary patterns, ordered from most
    /// significant to least.
    pub fn with_delimiters(
        chunk_size: usize,
        chunk_overlap: usize,
        delimiter_patterns: &[&str],
    ) -> Result<Self, SplitterError> {
        if chunk_size <= chunk_overlap {
            return Err(SplitterError::InvalidWindow {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        let delimiters = delimiter_patterns
            .iter()
            .map(|&pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TextSplitter {
            chunk_size,
            chunk_overlap,
            delimiters,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits `text` into overlapping windows.
    ///
    /// Empty or whitespace-only input produces no chunks; any other input
    /// produces at least one.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_ranges(text)
            .into_iter()
            .map(|range| text[range].to_string())
            .collect()
    }

    /// Like [`split`](Self::split), but returns byte ranges into `text`.
    ///
    /// Ranges are ordered, start at 0, end at `text.len()`, and each range
    /// after the first starts inside (or at the end of) the previous one, so
    /// concatenating each range's non-overlapped suffix reconstructs the
    /// input exactly.
    pub fn split_ranges(&self, text: &str) -> Vec<Range<usize>> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let len = text.len();
        let mut ranges: Vec<Range<usize>> = Vec::new();
        let mut start = 0usize;

        loop {
            let limit = floor_char_boundary(text, (start + self.chunk_size).min(len));
            let end = if limit >= len {
                len
            } else {
                self.snap_window_end(text, start, limit)
            };
            ranges.push(start..end);

            if end >= len {
                break;
            }

            // Next window begins `chunk_size - chunk_overlap` into this one,
            // measured from the realized end. Always advance by at least one
            // byte so pathological inputs cannot loop.
            let next = end.saturating_sub(self.chunk_overlap).max(start + 1);
            start = ceil_char_boundary(text, next);
        }

        ranges
    }

    // Pulls the window end back from the hard byte limit to the most
    // significant boundary available, scanning delimiter patterns in priority
    // order. Only boundaries in the trailing half of the window are accepted,
    // so snapping never collapses a window below half its size.
    fn snap_window_end(&self, text: &str, start: usize, limit: usize) -> usize {
        let window = &text[start..limit];
        let min_end = window.len() / 2;

        for delimiter in &self.delimiters {
            if let Some(boundary) = delimiter
                .find_iter(window)
                .map(|mat| mat.end())
                .filter(|&end| end > min_end)
                .last()
            {
                return start + boundary;
            }
        }
        limit
    }
}

/// Attaches provenance metadata to split output: each piece becomes a
/// [`Chunk`] tagged with the source filename, its position, and the total
/// count.
pub fn tag_chunks(source: &str, pieces: Vec<String>) -> Vec<Chunk> {
    let total_chunks = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            text,
            source: source.to_string(),
            chunk_index,
            total_chunks,
        })
        .collect()
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(text: &str, ranges: &[Range<usize>]) -> String {
        let mut out = String::new();
        let mut covered = 0usize;
        for range in ranges {
            assert!(range.start <= covered, "gap between windows");
            out.push_str(&text[covered.max(range.start)..range.end]);
            covered = range.end;
        }
        out
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let splitter = TextSplitter::new(500, 100).unwrap();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("   \n\n  ").is_empty());
    }

    #[test]
    fn short_input_yields_single_chunk() {
        let splitter = TextSplitter::new(500, 100).unwrap();
        let text = "A single short paragraph.";
        assert_eq!(splitter.split(text), vec![text.to_string()]);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(
            TextSplitter::new(100, 100),
            Err(SplitterError::InvalidWindow { .. })
        ));
        assert!(matches!(
            TextSplitter::new(100, 200),
            Err(SplitterError::InvalidWindow { .. })
        ));
        assert!(TextSplitter::new(100, 0).is_ok());
    }

    #[test]
    fn windows_respect_size_and_reconstruct_input() {
        let splitter = TextSplitter::new(500, 100).unwrap();
        let text = (0..100)
            .map(|i| format!("Sentence number {i} in a test document. "))
            .collect::<String>();

        let ranges = splitter.split_ranges(&text);
        assert!(ranges.len() > 1);
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges.last().unwrap().end, text.len());

        for range in &ranges {
            assert!(range.end - range.start <= 500);
        }
        for pair in ranges.windows(2) {
            // Overlapping windows: the next one starts inside the previous.
            assert!(pair[1].start < pair[0].end);
            assert!(pair[1].end > pair[0].end);
        }

        assert_eq!(reconstruct(&text, &ranges), text);
    }

    #[test]
    fn window_ends_prefer_sentence_boundaries() {
        let splitter = TextSplitter::new(120, 20).unwrap();
        let text = "First sentence of the document body. Second sentence with \
                    some extra words. Third sentence keeps the text going well \
                    past a single window. Fourth sentence for good measure.";

        let pieces = splitter.split(text);
        assert!(pieces.len() > 1);
        // Every non-final window should end right after sentence punctuation.
        for piece in &pieces[..pieces.len() - 1] {
            assert!(
                piece.trim_end().ends_with('.'),
                "window not sentence-aligned: {piece:?}"
            );
        }
    }

    #[test]
    fn overlap_carries_trailing_text_forward() {
        let splitter = TextSplitter::new(200, 50).unwrap();
        let text = (0..30)
            .map(|i| format!("Filler sentence number {i}. "))
            .collect::<String>();

        let ranges = splitter.split_ranges(&text);
        for pair in ranges.windows(2) {
            let shared = pair[0].end - pair[1].start;
            assert!(shared <= 50);
            assert!(shared > 0);
        }
    }

    #[test]
    fn split_is_deterministic() {
        let splitter = TextSplitter::new(300, 60).unwrap();
        let text = (0..50)
            .map(|i| format!("Deterministic sentence {i}. "))
            .collect::<String>();
        assert_eq!(splitter.split(&text), splitter.split(&text));
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let splitter = TextSplitter::new(40, 10).unwrap();
        let text = "héllo wörld grüße ".repeat(20);
        let pieces = splitter.split(&text);
        assert!(pieces.len() > 1);
        // Slicing mid-codepoint would have panicked; also confirm sizes.
        for piece in &pieces {
            assert!(piece.len() <= 40);
        }
    }

    #[test]
    fn tag_chunks_attaches_provenance() {
        let chunks = tag_chunks(
            "policy.txt",
            vec!["first".to_string(), "second".to_string()],
        );
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source, "policy.txt");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert!(chunks.iter().all(|c| c.total_chunks == 2));
    }
}
