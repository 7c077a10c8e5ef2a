//! # chorus-embed
//!
//! Text embedding generation for the chorus retrieval pipeline, with a focus
//! on local ONNX models via FastEmbed. Designed for async operation with a
//! clean provider abstraction so the index never depends on a specific model.
//!
//! ## Features
//!
//! - **Local ONNX Models**: run embedding models locally without external API calls
//! - **Async-First Design**: full async/await support with tokio integration
//! - **Model Caching**: process-wide caching to avoid reloading models
//! - **Half-Precision**: memory-efficient f16 embeddings, L2-normalized at
//!   conversion so cosine similarity is a dot product
//! - **Deterministic Fallback**: a hashing provider with no model files for
//!   tests and offline use
//!
//! ## Quick Start
//!
//! ```no_run
//! use chorus_embed::{EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = FastEmbedProvider::create().await?;
//!
//! let texts = vec!["Hello world".to_string(), "How are you?".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`provider`]: the [`EmbeddingProvider`] trait and the FastEmbed implementation
//! - [`hashing`]: the deterministic [`HashEmbedProvider`]
//! - [`error`]: error types and result handling
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`EmbedError`] type,
//! which provides detailed context about failures including configuration
//! errors, model loading issues, and runtime failures.

pub mod error;
pub mod hashing;
pub mod provider;

// Re-export main types for easy access
pub use error::{EmbedError, Result};
pub use hashing::HashEmbedProvider;
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
