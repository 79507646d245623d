//! Wires configured collaborators into the ingestion pipeline and retriever.

use crate::config::Settings;
use crate::embedding::{create_embedder, Embedder};
use crate::error::Result;
use crate::ingestion::{Captioner, IngestOptions, IngestReport, IngestionPipeline, OpenAICaptioner};
use crate::retrieval::Retriever;
use crate::vector_store::{create_vector_store, VectorStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Shared embedder and vector store for one configuration.
pub struct Orchestrator {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl Orchestrator {
    pub fn new(settings: Settings) -> Result<Self> {
        let embedder = create_embedder(&settings.embedding)?;
        let vector_store = create_vector_store(&settings.vector_store)?;
        Ok(Self::with_components(settings, embedder, vector_store))
    }

    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            settings,
            embedder,
            vector_store,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Retriever over the configured collection.
    pub fn retriever(&self) -> Retriever {
        Retriever::new(
            self.embedder.clone(),
            self.vector_store.clone(),
            &self.settings.ingestion.collection,
        )
    }

    /// Pipeline with the captioner attached when enabled.
    ///
    /// A captioner that cannot be built (for example without an API key)
    /// leaves images on the fallback description.
    pub fn pipeline(&self) -> IngestionPipeline {
        let pipeline = IngestionPipeline::new(
            self.embedder.clone(),
            self.vector_store.clone(),
            IngestOptions::from_settings(&self.settings),
        );

        if !self.settings.captioning.enabled {
            return pipeline;
        }

        match OpenAICaptioner::new(&self.settings.captioning) {
            Ok(captioner) => {
                let captioner: Arc<dyn Captioner> = Arc::new(captioner);
                pipeline.with_captioner(captioner)
            }
            Err(e) => {
                warn!("Image captioning disabled: {}", e);
                pipeline
            }
        }
    }

    /// Ingest `source_dir`, or the configured source folder.
    #[instrument(skip(self))]
    pub async fn ingest(&self, source_dir: Option<&Path>) -> Result<IngestReport> {
        let source = match source_dir {
            Some(dir) => dir.to_path_buf(),
            None => self.settings.source_dir(),
        };
        info!("Ingesting documents from {}", source.display());
        self.pipeline().run(&source).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::test_support::KeywordEmbedder;
    use crate::vector_store::MemoryVectorStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ingest_then_search() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("docs");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("notes.txt"), "quarterly revenue summary").unwrap();

        let mut settings = Settings::default();
        settings.captioning.enabled = false;
        settings.ingestion.image_output_dir = dir.path().join("images").display().to_string();
        settings.ingestion.table_output_dir = dir.path().join("tables").display().to_string();

        let orchestrator = Orchestrator::with_components(
            settings,
            Arc::new(KeywordEmbedder {
                keywords: vec!["revenue", "summary"],
            }),
            Arc::new(MemoryVectorStore::new()),
        );

        let report = orchestrator.ingest(Some(&source)).await.unwrap();
        assert_eq!(report.units_appended, 1);

        let results = orchestrator.retriever().search("revenue", 5, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].unit.source_document, "notes.txt");
    }
}
