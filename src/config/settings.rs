//! Configuration settings for docgate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub database: DatabaseSettings,
    pub ingestion: IngestionSettings,
    pub embedding: EmbeddingSettings,
    pub captioning: CaptioningSettings,
    pub vector_store: VectorStoreSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.docgate".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Relational backend type for the gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// Embedded single-file database.
    #[default]
    Sqlite,
    /// PostgreSQL server.
    Postgres,
}

impl std::str::FromStr for DatabaseBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(DatabaseBackend::Sqlite),
            "postgres" | "postgresql" => Ok(DatabaseBackend::Postgres),
            _ => Err(format!("Unknown database backend: {}", s)),
        }
    }
}

impl std::fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackend::Sqlite => write!(f, "sqlite"),
            DatabaseBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Gateway database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Backend used by the gateway.
    pub backend: DatabaseBackend,
    /// Path to the SQLite database file (sqlite backend).
    pub sqlite_path: String,
    /// Connection string (postgres backend), e.g. `host=localhost user=postgres dbname=app`.
    pub postgres_url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Sqlite,
            sqlite_path: "database.db".to_string(),
            postgres_url: "host=localhost port=5432 user=postgres dbname=postgres".to_string(),
        }
    }
}

/// Document ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Folder scanned for source documents.
    pub source_dir: String,
    /// Where extracted images are written.
    pub image_output_dir: String,
    /// Where extracted tables are written as CSV.
    pub table_output_dir: String,
    /// Vector store collection receiving the extracted units.
    pub collection: String,
    /// Number of header names listed in a table description.
    pub description_columns: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            source_dir: "pdfs".to_string(),
            image_output_dir: "pdf_images".to_string(),
            table_output_dir: "pdf_tables".to_string(),
            collection: "multimodal_rag".to_string(),
            description_columns: 5,
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI embeddings API.
    #[default]
    OpenAI,
    /// Local Ollama server.
    Ollama,
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::OpenAI => write!(f, "openai"),
            EmbeddingProvider::Ollama => write!(f, "ollama"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, ollama).
    pub provider: EmbeddingProvider,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Base URL of the Ollama server (ollama provider).
    pub ollama_url: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            ollama_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Image captioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptioningSettings {
    /// Ask a vision model to describe extracted images.
    pub enabled: bool,
    /// Vision-capable chat model.
    pub model: String,
    /// Instruction sent alongside each image.
    pub prompt: String,
}

impl Default for CaptioningSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            prompt: "Describe this image in one short sentence.".to_string(),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.docgate/vectors.db".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::DocgateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docgate")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded gateway SQLite path.
    pub fn database_path(&self) -> PathBuf {
        Self::expand_path(&self.database.sqlite_path)
    }

    /// Get the expanded vector store SQLite path.
    pub fn vector_store_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    pub fn source_dir(&self) -> PathBuf {
        Self::expand_path(&self.ingestion.source_dir)
    }

    pub fn image_output_dir(&self) -> PathBuf {
        Self::expand_path(&self.ingestion.image_output_dir)
    }

    pub fn table_output_dir(&self) -> PathBuf {
        Self::expand_path(&self.ingestion.table_output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [database]
            backend = "postgres"

            [ingestion]
            collection = "handbook"
            "#,
        )
        .unwrap();

        assert_eq!(settings.database.backend, DatabaseBackend::Postgres);
        assert_eq!(settings.database.sqlite_path, "database.db");
        assert_eq!(settings.ingestion.collection, "handbook");
        assert_eq!(settings.ingestion.description_columns, 5);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::OpenAI);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.embedding.provider = EmbeddingProvider::Ollama;
        settings.embedding.dimensions = 384;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.embedding.provider, EmbeddingProvider::Ollama);
        assert_eq!(loaded.embedding.dimensions, 384);
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("PostgreSQL".parse::<DatabaseBackend>(), Ok(DatabaseBackend::Postgres));
        assert_eq!("sqlite".parse::<DatabaseBackend>(), Ok(DatabaseBackend::Sqlite));
        assert!("mysql".parse::<DatabaseBackend>().is_err());
    }
}
