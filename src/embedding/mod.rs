//! Embedding generation for semantic search and retrieval.

mod ollama;
mod openai;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Build the embedder named in the settings.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let dimensions = settings.dimensions as usize;
    match settings.provider {
        EmbeddingProvider::OpenAI => Ok(Arc::new(OpenAIEmbedder::with_config(
            &settings.model,
            dimensions,
        )?)),
        EmbeddingProvider::Ollama => Ok(Arc::new(OllamaEmbedder::new(
            &settings.ollama_url,
            &settings.model,
            dimensions,
        )?)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::DocgateError;

    /// Deterministic embedder: counts keyword hits per axis.
    pub struct KeywordEmbedder {
        pub keywords: Vec<&'static str>,
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(self
                .keywords
                .iter()
                .map(|k| lower.matches(k).count() as f32 + 0.01)
                .collect())
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            self.keywords.len()
        }
    }

    /// Embedder that always fails.
    pub struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _: &str) -> Result<Vec<f32>> {
            Err(DocgateError::Embedding("service unavailable".to_string()))
        }

        async fn embed_batch(&self, _: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(DocgateError::Embedding("service unavailable".to_string()))
        }

        fn dimensions(&self) -> usize {
            3
        }
    }
}
