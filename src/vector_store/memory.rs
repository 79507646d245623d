//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{check_dimensions, rank, CollectionInfo, ExtractedUnit, SearchResult, VectorStore};
use crate::error::{DocgateError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

struct Collection {
    dimension: usize,
    created_at: DateTime<Utc>,
    units: Vec<ExtractedUnit>,
}

impl Collection {
    fn info(&self, name: &str) -> CollectionInfo {
        CollectionInfo {
            name: name.to_string(),
            dimension: self.dimension,
            unit_count: self.units.len(),
            created_at: self.created_at,
        }
    }
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|e| DocgateError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|e| DocgateError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<CollectionInfo> {
        let mut collections = self.write()?;
        let collection = collections.entry(name.to_string()).or_insert_with(|| Collection {
            dimension,
            created_at: Utc::now(),
            units: Vec::new(),
        });

        if collection.dimension != dimension {
            return Err(DocgateError::VectorStore(format!(
                "Collection '{}' has dimension {}, not {}",
                name, collection.dimension, dimension
            )));
        }
        Ok(collection.info(name))
    }

    async fn collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        Ok(self.read()?.get(name).map(|c| c.info(name)))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let collections = self.read()?;
        let mut infos: Vec<CollectionInfo> = collections.iter().map(|(n, c)| c.info(n)).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    async fn append(&self, collection: &str, units: &[ExtractedUnit]) -> Result<usize> {
        let Some(first) = units.first() else {
            return Ok(0);
        };
        self.create_collection(collection, first.embedding.len()).await?;

        let mut collections = self.write()?;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| DocgateError::NotFound(collection.to_string()))?;
        check_dimensions(collection, entry.dimension, units)?;
        entry.units.extend_from_slice(units);
        Ok(units.len())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.read()?;
        let units = collections
            .get(collection)
            .map(|c| c.units.clone())
            .unwrap_or_default();
        Ok(rank(units, query_embedding, limit))
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<ExtractedUnit>> {
        Ok(self
            .read()?
            .get(collection)
            .and_then(|c| c.units.iter().find(|u| u.id == id).cloned()))
    }

    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<ExtractedUnit>> {
        Ok(self
            .read()?
            .get(collection)
            .map(|c| c.units.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.read()?.get(collection).map(|c| c.units.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_support::{image_unit, text_unit};

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let first = text_unit("alpha", vec![1.0, 0.0, 0.0]);
        let second = image_unit(vec![0.0, 1.0, 0.0]);
        store.append("docs", &[first.clone(), second.clone()]).await.unwrap();

        let results = store.search("docs", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].unit.id, first.id);
        assert!((results[0].score - 1.0).abs() < 0.001);

        assert_eq!(store.get("docs", second.id).await.unwrap(), Some(second));
        assert_eq!(store.count("docs").await.unwrap(), 2);
        assert_eq!(store.count("other").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dimension_fixed_on_creation() {
        let store = MemoryVectorStore::new();
        store.append("docs", &[text_unit("a", vec![1.0, 0.0])]).await.unwrap();

        let err = store.append("docs", &[text_unit("b", vec![1.0, 0.0, 0.0])]).await;
        assert!(err.is_err());
        assert!(store.create_collection("docs", 3).await.is_err());
        assert_eq!(store.count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reappending_duplicates() {
        let store = MemoryVectorStore::new();
        let unit = text_unit("a", vec![1.0]);
        store.append("docs", &[unit.clone()]).await.unwrap();
        store.append("docs", &[unit]).await.unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 2);
    }
}
