//! Local embedding provider using fastembed-rs.

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex;

use crate::error::{EmbeddingError, Result};

use super::EmbeddingProvider;

/// Local embedding provider using fastembed-rs with ONNX models.
pub struct LocalEmbeddingProvider {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
    max_batch_size: usize,
}

impl LocalEmbeddingProvider {
    /// Create a new local embedding provider with the specified model.
    pub fn new(model_name: &str) -> Result<Self> {
        let model = Self::load_model(model_name)?;
        let dimension = Self::get_model_dimension(model_name);

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimension,
            max_batch_size: 32, // Conservative default for local models
        })
    }

    /// Create with the default multilingual model. Guest messages arrive in
    /// several languages, so the default must not be English-only.
    pub fn default_model() -> Result<Self> {
        Self::new("intfloat/multilingual-e5-small")
    }

    fn load_model(model_name: &str) -> Result<TextEmbedding> {
        let model = Self::parse_model_name(model_name)?;

        let options = InitOptions::new(model).with_show_download_progress(true);

        TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("{}: {}", model_name, e)).into())
    }

    fn parse_model_name(model_name: &str) -> Result<EmbeddingModel> {
        match model_name {
            "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
                Ok(EmbeddingModel::AllMiniLML6V2)
            }
            "sentence-transformers/all-MiniLM-L12-v2" | "all-MiniLM-L12-v2" => {
                Ok(EmbeddingModel::AllMiniLML12V2)
            }
            "intfloat/multilingual-e5-small" | "multilingual-e5-small" => {
                Ok(EmbeddingModel::MultilingualE5Small)
            }
            "intfloat/multilingual-e5-base" | "multilingual-e5-base" => {
                Ok(EmbeddingModel::MultilingualE5Base)
            }
            _ => Err(EmbeddingError::ModelNotFound(format!(
                "Unknown model: {}. Supported: bge-small-en-v1.5, bge-base-en-v1.5, \
                all-MiniLM-L6-v2, all-MiniLM-L12-v2, multilingual-e5-small/base",
                model_name
            ))
            .into()),
        }
    }

    fn get_model_dimension(model_name: &str) -> usize {
        match model_name {
            s if s.contains("bge-small") => 384,
            s if s.contains("bge-base") => 768,
            s if s.contains("MiniLM-L6") => 384,
            s if s.contains("MiniLM-L12") => 384,
            s if s.contains("multilingual-e5-small") => 384,
            s if s.contains("multilingual-e5-base") => 768,
            _ => 384, // Default fallback
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // Clone texts for the blocking operation
        let texts = texts.to_vec();
        let model = self.model.clone();

        // Run the embedding in a blocking task since fastembed is synchronous
        let embeddings = tokio::task::spawn_blocking(move || {
            let mut model = model.blocking_lock();
            model.embed(texts, None)
        })
        .await
        .map_err(|e| EmbeddingError::Backend(format!("Task join error: {}", e)))?
        .map_err(|e| EmbeddingError::Backend(format!("Embedding failed: {}", e)))?;

        for vector in &embeddings {
            if vector.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    got: vector.len(),
                }
                .into());
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}
