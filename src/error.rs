//! Error types for docgate.

use thiserror::Error;

/// Library-level error type for docgate operations.
///
/// Gateway operations have their own taxonomy in [`crate::gateway::GatewayError`]
/// because they never propagate failures past the operation boundary.
#[derive(Error, Debug)]
pub enum DocgateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Captioning failed: {0}")]
    Captioning(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for docgate operations.
pub type Result<T> = std::result::Result<T, DocgateError>;
