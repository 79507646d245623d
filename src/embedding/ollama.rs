//! Ollama embeddings over its local HTTP API.

use super::Embedder;
use crate::error::{DocgateError, Result};
use crate::openai::{http_client, DEFAULT_TIMEOUT_SECS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedder backed by a local Ollama server.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embeddings", self.base_url)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&EmbedRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DocgateError::Embedding(format!(
                "Ollama embedding failed: HTTP {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response.json().await?;
        if body.embedding.len() != self.dimensions {
            return Err(DocgateError::Embedding(format!(
                "Model {} returned {} dimensions, expected {}",
                self.model,
                body.embedding.len(),
                self.dimensions
            )));
        }
        Ok(body.embedding)
    }

    // The endpoint takes one prompt per request.
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
