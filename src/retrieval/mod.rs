//! Semantic retrieval over ingested units.

mod multimodal;

pub use multimodal::{GroupedResults, ImageHit, ResponsePart, TableHit};

use crate::embedding::Embedder;
use crate::error::{DocgateError, Result};
use crate::vector_store::{ContentType, ExtractedUnit, SearchResult, VectorStore};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Default number of nearest units.
pub const DEFAULT_K: usize = 5;

/// Embeds queries and looks them up in one collection.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, collection: &str) -> Self {
        Self {
            embedder,
            store,
            collection: collection.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn ensure_collection(&self) -> Result<()> {
        match self.store.collection(&self.collection).await? {
            Some(_) => Ok(()),
            None => Err(DocgateError::NotFound(format!(
                "collection '{}' (ingest documents first)",
                self.collection
            ))),
        }
    }

    /// The `k` nearest units, then restricted to `content_type` if given.
    ///
    /// The filter runs after the nearest-neighbour cut, so a filtered search
    /// can return fewer than `k` results.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        content_type: Option<ContentType>,
    ) -> Result<Vec<SearchResult>> {
        self.ensure_collection().await?;

        let query_embedding = self.embedder.embed(query).await?;
        let mut results = self.store.search(&self.collection, &query_embedding, k).await?;

        if let Some(content_type) = content_type {
            results.retain(|r| r.unit.content_type == content_type);
        }

        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    /// Search and group the hits by modality.
    pub async fn search_grouped(&self, query: &str, k: usize) -> Result<GroupedResults> {
        let results = self.search(query, k, None).await?;
        Ok(GroupedResults::from_results(&results))
    }

    /// Look up a unit by its id string.
    pub async fn get(&self, id: &str) -> Result<Option<ExtractedUnit>> {
        let id = Uuid::parse_str(id)
            .map_err(|_| DocgateError::InvalidInput(format!("'{}' is not a valid unit id", id)))?;
        self.ensure_collection().await?;
        self.store.get(&self.collection, id).await
    }

    /// Units in insertion order.
    pub async fn list(&self, limit: usize) -> Result<Vec<ExtractedUnit>> {
        self.ensure_collection().await?;
        self.store.list(&self.collection, limit).await
    }
}
