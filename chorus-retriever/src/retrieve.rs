//! Similarity retrieval and context formatting.
//!
//! Thin pass-through to the index's search plus the rendering used for
//! grounding messages: one labeled block per hit, blank-line separated. When
//! nothing is retrieved the formatter returns [`NO_CONTEXT_SENTINEL`], a
//! fixed constant callers compare against instead of parsing prose.

use crate::index::{EmbeddingIndex, RetrievalResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Returned by [`RetrievalService::format_context`] when there are no
/// results. Compare against this constant; it never appears as a real
/// grounding block.
pub const NO_CONTEXT_SENTINEL: &str = "No relevant documents found.";

/// Query counters, shared across clones of the service.
#[derive(Debug, Default)]
pub struct RetrievalStats {
    queries: AtomicU64,
}

impl RetrievalStats {
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

/// Read-side facade over the index.
#[derive(Debug, Clone)]
pub struct RetrievalService {
    index: EmbeddingIndex,
    default_top_k: usize,
    stats: Arc<RetrievalStats>,
}

impl RetrievalService {
    pub fn new(index: EmbeddingIndex, default_top_k: usize) -> Self {
        Self {
            index,
            default_top_k,
            stats: Arc::new(RetrievalStats::default()),
        }
    }

    pub fn stats(&self) -> &RetrievalStats {
        &self.stats
    }

    /// Similarity search; `top_k` of `None` uses the configured default.
    /// Inherits the index's failure policy: never errors, an unretrievable
    /// query yields an empty list.
    pub async fn retrieve(&self, query: &str, top_k: Option<usize>) -> Vec<RetrievalResult> {
        self.stats.queries.fetch_add(1, Ordering::Relaxed);
        let limit = top_k.unwrap_or(self.default_top_k);
        let results = self.index.search(query, limit).await;
        tracing::debug!(query, limit, hits = results.len(), "retrieval query");
        results
    }

    /// Renders results as grounding blocks:
    ///
    /// ```text
    /// [Document 1: faq.txt]
    /// <content>
    ///
    /// [Document 2: handbook.pdf]
    /// <content>
    /// ```
    pub fn format_context(results: &[RetrievalResult]) -> String {
        if results.is_empty() {
            return NO_CONTEXT_SENTINEL.to_string();
        }

        results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                format!(
                    "[Document {}: {}]\n{}",
                    i + 1,
                    result.metadata.source,
                    result.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Retrieve and format in one step.
    pub async fn context_for_query(&self, query: &str, top_k: Option<usize>) -> String {
        let results = self.retrieve(query, top_k).await;
        Self::format_context(&results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ChunkMetadata;
    use chorus_context::tag_chunks;
    use chorus_embed::HashEmbedProvider;

    fn result(source: &str, content: &str) -> RetrievalResult {
        RetrievalResult {
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                chunk_index: 0,
                total_chunks: 1,
            },
            similarity_score: 0.9,
        }
    }

    #[test]
    fn formats_labeled_blocks_joined_by_blank_lines() {
        let formatted = RetrievalService::format_context(&[
            result("faq.txt", "Returns within 30 days."),
            result("handbook.pdf", "Shipping takes a week."),
        ]);

        assert_eq!(
            formatted,
            "[Document 1: faq.txt]\nReturns within 30 days.\n\n\
             [Document 2: handbook.pdf]\nShipping takes a week."
        );
    }

    #[test]
    fn empty_results_yield_the_sentinel() {
        let formatted = RetrievalService::format_context(&[]);
        assert_eq!(formatted, NO_CONTEXT_SENTINEL);
    }

    #[tokio::test]
    async fn retrieve_uses_default_top_k_and_counts_queries() {
        let index = EmbeddingIndex::open_memory(std::sync::Arc::new(HashEmbedProvider::default()))
            .await
            .unwrap();
        let texts: Vec<String> = (0..8).map(|i| format!("passage number {i}")).collect();
        index.insert(&tag_chunks("doc.txt", texts)).await.unwrap();

        let service = RetrievalService::new(index, 3);
        let results = service.retrieve("passage number", None).await;
        assert_eq!(results.len(), 3);

        let more = service.retrieve("passage number", Some(5)).await;
        assert_eq!(more.len(), 5);

        assert_eq!(service.stats().queries(), 2);
    }

    #[tokio::test]
    async fn context_for_query_on_empty_index_is_sentinel() {
        let index = EmbeddingIndex::open_memory(std::sync::Arc::new(HashEmbedProvider::default()))
            .await
            .unwrap();
        let service = RetrievalService::new(index, 3);
        assert_eq!(
            service.context_for_query("anything", None).await,
            NO_CONTEXT_SENTINEL
        );
    }
}
