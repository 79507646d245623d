//! Vector store abstraction for docgate.
//!
//! Stores extracted units in named, append-only collections. Each collection
//! fixes its embedding dimension when it is created.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::config::{Settings, VectorStoreSettings};
use crate::error::{DocgateError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Modality of an extracted unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Table,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Table => "table",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = DocgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ContentType::Text),
            "image" => Ok(ContentType::Image),
            "table" => Ok(ContentType::Table),
            _ => Err(DocgateError::InvalidInput(format!(
                "Unknown content type: {} (expected text, image or table)",
                s
            ))),
        }
    }
}

/// Modality-specific data carried alongside a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UnitPayload {
    None,
    Image {
        /// Raw image bytes, base64-encoded.
        image_b64: String,
        image_path: String,
    },
    Table {
        /// Rows as objects keyed by header.
        table_json: Value,
        table_csv: String,
        table_path: String,
        rows: usize,
        columns: usize,
    },
}

/// One retrievable piece of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedUnit {
    pub id: Uuid,
    /// Text used for display (page text, or a description for images and tables).
    pub content: String,
    pub content_type: ContentType,
    /// File name of the source document.
    pub source_document: String,
    /// 1-based page number.
    pub page: u32,
    pub embedding: Vec<f32>,
    pub payload: UnitPayload,
    pub indexed_at: DateTime<Utc>,
}

impl ExtractedUnit {
    /// Create a new unit with a fresh id.
    pub fn new(
        content: String,
        content_type: ContentType,
        source_document: String,
        page: u32,
        embedding: Vec<f32>,
        payload: UnitPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            content_type,
            source_document,
            page,
            embedding,
            payload,
            indexed_at: Utc::now(),
        }
    }

    /// JSON mirror of the unit's descriptive fields.
    pub fn metadata(&self) -> Value {
        let mut metadata = json!({
            "type": self.content_type,
            "source": self.source_document,
            "page": self.page,
        });

        match &self.payload {
            UnitPayload::None => {}
            UnitPayload::Image {
                image_b64,
                image_path,
            } => {
                metadata["image_path"] = json!(image_path);
                metadata["image_b64"] = json!(image_b64);
            }
            UnitPayload::Table {
                table_path,
                rows,
                columns,
                ..
            } => {
                metadata["table_path"] = json!(table_path);
                metadata["rows"] = json!(rows);
                metadata["columns"] = json!(columns);
            }
        }

        metadata
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub unit: ExtractedUnit,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Summary of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub unit_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a collection, or open it if it already exists with the same
    /// dimension.
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<CollectionInfo>;

    async fn collection(&self, name: &str) -> Result<Option<CollectionInfo>>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// Append units to a collection, creating it on first use.
    async fn append(&self, collection: &str, units: &[ExtractedUnit]) -> Result<usize>;

    /// Nearest units by cosine similarity.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>>;

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<ExtractedUnit>>;

    /// Units in insertion order.
    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<ExtractedUnit>>;

    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Open the store named in the settings.
pub fn create_vector_store(settings: &VectorStoreSettings) -> Result<Arc<dyn VectorStore>> {
    match settings.provider.to_lowercase().as_str() {
        "sqlite" => {
            let path = Settings::expand_path(&settings.sqlite_path);
            Ok(Arc::new(SqliteVectorStore::new(&path)?))
        }
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        other => Err(DocgateError::Config(format!(
            "Unknown vector store provider: {} (expected sqlite or memory)",
            other
        ))),
    }
}

/// Check that every unit matches the collection dimension.
pub(crate) fn check_dimensions(collection: &str, dimension: usize, units: &[ExtractedUnit]) -> Result<()> {
    match units.iter().find(|u| u.embedding.len() != dimension) {
        Some(unit) => Err(DocgateError::VectorStore(format!(
            "Embedding dimension mismatch in collection '{}': expected {}, got {}",
            collection,
            dimension,
            unit.embedding.len()
        ))),
        None => Ok(()),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score and rank units against a query.
pub(crate) fn rank(
    units: impl IntoIterator<Item = ExtractedUnit>,
    query_embedding: &[f32],
    limit: usize,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = units
        .into_iter()
        .map(|unit| {
            let score = cosine_similarity(query_embedding, &unit.embedding);
            SearchResult { unit, score }
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}
