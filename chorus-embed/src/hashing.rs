//! Deterministic hashing-based embedding provider.
//!
//! Projects text into a fixed-size vector by FNV-hashing words and character
//! trigrams into buckets, then L2-normalizing. No model files, no network,
//! and identical text always yields the identical vector, so exact-text
//! queries score 1.0 against their stored chunk. Useful for tests and for
//! running the pipeline where the ONNX model cannot be loaded; retrieval
//! quality is lexical rather than semantic.

use crate::error::Result;
use crate::provider::{EmbeddingProvider, EmbeddingResult, convert_to_f16};
use async_trait::async_trait;
use fnv::FnvHasher;
use half::f16;
use std::hash::Hasher;

/// Default number of hash buckets per vector.
pub const DEFAULT_HASH_DIMENSION: usize = 256;

/// Embedding provider backed by feature hashing instead of a learned model.
#[derive(Debug, Clone)]
pub struct HashEmbedProvider {
    dimension: usize,
}

impl Default for HashEmbedProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSION)
    }
}

impl HashEmbedProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, feature: &[u8]) -> usize {
        let mut hasher = FnvHasher::default();
        hasher.write(feature);
        (hasher.finish() % self.dimension as u64) as usize
    }

    fn embed_one(&self, text: &str) -> Vec<f16> {
        let mut weights = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();

        for word in lowered.split_whitespace() {
            weights[self.bucket(word.as_bytes())] += 1.0;

            let chars: Vec<char> = word.chars().collect();
            for gram in chars.windows(3) {
                let gram: String = gram.iter().collect();
                weights[self.bucket(gram.as_bytes())] += 1.0;
            }
        }

        convert_to_f16(vec![weights]).pop().unwrap_or_default()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        Ok(self.embed_one(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        let embeddings = texts.iter().map(|text| self.embed_one(text)).collect();
        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hash"
    }
}
