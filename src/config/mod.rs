//! Configuration module for docgate.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    CaptioningSettings, DatabaseBackend, DatabaseSettings, EmbeddingProvider, EmbeddingSettings,
    GeneralSettings, IngestionSettings, Settings, VectorStoreSettings,
};
