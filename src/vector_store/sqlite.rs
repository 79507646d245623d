//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Every search is a full scan of the collection.

use super::{
    check_dimensions, rank, CollectionInfo, ContentType, ExtractedUnit, SearchResult, UnitPayload,
    VectorStore,
};
use crate::error::{DocgateError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    dimension INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS units (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL,
    collection TEXT NOT NULL REFERENCES collections(name),
    content TEXT NOT NULL,
    content_type TEXT NOT NULL,
    source_document TEXT NOT NULL,
    page INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    payload TEXT NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_units_collection ON units(collection);
CREATE INDEX IF NOT EXISTS idx_units_id ON units(id);
"#;

const UNIT_COLUMNS: &str =
    "id, content, content_type, source_document, page, embedding, payload, indexed_at";

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DocgateError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_time(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn collection_info(conn: &Connection, name: &str) -> Result<Option<CollectionInfo>> {
        let info = conn
            .query_row(
                r#"
                SELECT c.name, c.dimension, c.created_at,
                       (SELECT COUNT(*) FROM units u WHERE u.collection = c.name)
                FROM collections c
                WHERE c.name = ?1
                "#,
                params![name],
                Self::row_to_info,
            )
            .optional()?;
        Ok(info)
    }

    fn row_to_info(row: &Row<'_>) -> rusqlite::Result<CollectionInfo> {
        let dimension: i64 = row.get(1)?;
        let created_at: String = row.get(2)?;
        let unit_count: i64 = row.get(3)?;
        Ok(CollectionInfo {
            name: row.get(0)?,
            dimension: dimension as usize,
            unit_count: unit_count as usize,
            created_at: Self::parse_time(&created_at),
        })
    }

    /// Raw columns of a unit row, decoded afterwards so JSON errors surface.
    fn read_row(row: &Row<'_>) -> rusqlite::Result<UnitRow> {
        Ok(UnitRow {
            id: row.get(0)?,
            content: row.get(1)?,
            content_type: row.get(2)?,
            source_document: row.get(3)?,
            page: row.get(4)?,
            embedding: row.get(5)?,
            payload: row.get(6)?,
            indexed_at: row.get(7)?,
        })
    }

    fn query_units(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<ExtractedUnit>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::read_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(UnitRow::into_unit).collect()
    }
}

struct UnitRow {
    id: String,
    content: String,
    content_type: String,
    source_document: String,
    page: i64,
    embedding: Vec<u8>,
    payload: String,
    indexed_at: String,
}

impl UnitRow {
    fn into_unit(self) -> Result<ExtractedUnit> {
        let payload: UnitPayload = serde_json::from_str(&self.payload)?;
        Ok(ExtractedUnit {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            content: self.content,
            content_type: self.content_type.parse::<ContentType>()?,
            source_document: self.source_document,
            page: self.page as u32,
            embedding: SqliteVectorStore::bytes_to_embedding(&self.embedding),
            payload,
            indexed_at: SqliteVectorStore::parse_time(&self.indexed_at),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self))]
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<CollectionInfo> {
        let conn = self.lock()?;

        if let Some(existing) = Self::collection_info(&conn, name)? {
            if existing.dimension != dimension {
                return Err(DocgateError::VectorStore(format!(
                    "Collection '{}' has dimension {}, not {}",
                    name, existing.dimension, dimension
                )));
            }
            return Ok(existing);
        }

        conn.execute(
            "INSERT INTO collections (name, dimension, created_at) VALUES (?1, ?2, ?3)",
            params![name, dimension as i64, Utc::now().to_rfc3339()],
        )?;
        info!("Created collection '{}' (dimension {})", name, dimension);

        Self::collection_info(&conn, name)?
            .ok_or_else(|| DocgateError::VectorStore(format!("Collection '{}' vanished", name)))
    }

    async fn collection(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let conn = self.lock()?;
        Self::collection_info(&conn, name)
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.name, c.dimension, c.created_at,
                   (SELECT COUNT(*) FROM units u WHERE u.collection = c.name)
            FROM collections c
            ORDER BY c.name
            "#,
        )?;
        let infos = stmt
            .query_map([], Self::row_to_info)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(infos)
    }

    #[instrument(skip(self, units), fields(count = units.len()))]
    async fn append(&self, collection: &str, units: &[ExtractedUnit]) -> Result<usize> {
        let Some(first) = units.first() else {
            return Ok(0);
        };
        let info = self.create_collection(collection, first.embedding.len()).await?;
        check_dimensions(collection, info.dimension, units)?;

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for unit in units {
            tx.execute(
                r#"
                INSERT INTO units
                (id, collection, content, content_type, source_document, page,
                 embedding, payload, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    unit.id.to_string(),
                    collection,
                    unit.content,
                    unit.content_type.as_str(),
                    unit.source_document,
                    unit.page,
                    Self::embedding_to_bytes(&unit.embedding),
                    serde_json::to_string(&unit.payload)?,
                    unit.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Appended {} units to '{}'", units.len(), collection);
        Ok(units.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;
        let units = Self::query_units(
            &conn,
            &format!("SELECT {} FROM units WHERE collection = ?1", UNIT_COLUMNS),
            params![collection],
        )?;

        let results = rank(units, query_embedding, limit);
        debug!("Found {} matching units", results.len());
        Ok(results)
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<ExtractedUnit>> {
        let conn = self.lock()?;
        let mut units = Self::query_units(
            &conn,
            &format!(
                "SELECT {} FROM units WHERE collection = ?1 AND id = ?2 ORDER BY seq LIMIT 1",
                UNIT_COLUMNS
            ),
            params![collection, id.to_string()],
        )?;
        Ok(units.pop())
    }

    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<ExtractedUnit>> {
        let conn = self.lock()?;
        Self::query_units(
            &conn,
            &format!(
                "SELECT {} FROM units WHERE collection = ?1 ORDER BY seq LIMIT ?2",
                UNIT_COLUMNS
            ),
            params![collection, limit as i64],
        )
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM units WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_support::{image_unit, text_unit};

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let text = text_unit("This is test content", vec![1.0, 0.0, 0.0]);
        let image = image_unit(vec![0.0, 1.0, 0.0]);
        store.append("docs", &[text.clone(), image.clone()]).await.unwrap();

        let collections = store.list_collections().await.unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].dimension, 3);
        assert_eq!(collections[0].unit_count, 2);

        let results = store.search("docs", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].unit.id, text.id);
        assert!((results[0].score - 1.0).abs() < 0.001);

        let fetched = store.get("docs", image.id).await.unwrap().unwrap();
        assert_eq!(fetched.payload, image.payload);
        assert_eq!(fetched.content_type, ContentType::Image);
        assert_eq!(fetched.embedding, image.embedding);
    }

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let units: Vec<ExtractedUnit> = (0..5)
            .map(|i| text_unit(&format!("unit {}", i), vec![i as f32, 1.0]))
            .collect();
        store.append("docs", &units).await.unwrap();

        let listed = store.list("docs", 3).await.unwrap();
        let contents: Vec<&str> = listed.iter().map(|u| u.content.as_str()).collect();
        assert_eq!(contents, ["unit 0", "unit 1", "unit 2"]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.create_collection("docs", 2).await.unwrap();

        let err = store.append("docs", &[text_unit("x", vec![1.0, 2.0, 3.0])]).await;
        assert!(matches!(err, Err(DocgateError::VectorStore(_))));
        assert_eq!(store.count("docs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");
        let unit = text_unit("kept", vec![0.5, 0.5]);

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store.append("docs", &[unit.clone()]).await.unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(store.get("docs", unit.id).await.unwrap().unwrap().content, "kept");
        assert!(store.collection("missing").await.unwrap().is_none());
    }
}
