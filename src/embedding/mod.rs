//! Embedding module for vector embeddings.
//!
//! Provides the [`EmbeddingProvider`] seam the indexer and retriever embed
//! through, plus a local ONNX-backed implementation.
//!
//! [`LocalEmbeddingProvider`] uses fastembed-rs; the default model is
//! multilingual since guest messages arrive in whatever language the guest
//! writes. The provider is a trait object everywhere downstream so tests can
//! substitute a deterministic stub.

mod local;
mod traits;

pub use local::LocalEmbeddingProvider;
pub use traits::EmbeddingProvider;

use crate::config::EmbeddingConfig;
use crate::error::Result;

/// Create an embedding provider from configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    let provider = LocalEmbeddingProvider::new(&config.model)?;
    Ok(Box::new(provider))
}
