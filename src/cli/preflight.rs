//! Pre-flight checks before expensive operations.
//!
//! Validates that required credentials and inputs are available
//! before starting work that would otherwise fail midway.

use crate::config::{EmbeddingProvider, Settings};
use crate::error::{DocgateError, Result};
use std::path::Path;

/// Requirements for different commands.
#[derive(Debug, Clone, Copy)]
pub enum Task {
    /// Ingestion embeds every unit and reads the source folder.
    Ingest,
    /// Search embeds the query.
    Search,
    /// Listing only reads the vector store.
    List,
}

/// Run pre-flight checks for the given task.
pub fn check(task: Task, settings: &Settings, source_dir: Option<&Path>) -> Result<()> {
    match task {
        Task::Ingest => {
            check_embedding_credentials(settings)?;
            let source = source_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| settings.source_dir());
            if !source.is_dir() {
                return Err(DocgateError::NotFound(format!(
                    "source folder {}",
                    source.display()
                )));
            }
        }
        Task::Search => check_embedding_credentials(settings)?,
        Task::List => {}
    }
    Ok(())
}

/// Only the OpenAI provider needs a key.
fn check_embedding_credentials(settings: &Settings) -> Result<()> {
    if settings.embedding.provider != EmbeddingProvider::OpenAI {
        return Ok(());
    }
    check_api_key()
}

fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(DocgateError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(DocgateError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ollama_settings() -> Settings {
        let mut settings = Settings::default();
        settings.embedding.provider = EmbeddingProvider::Ollama;
        settings
    }

    #[test]
    fn test_list_has_no_requirements() {
        assert!(check(Task::List, &Settings::default(), None).is_ok());
    }

    #[test]
    fn test_ingest_needs_source_folder() {
        let settings = ollama_settings();
        let dir = TempDir::new().unwrap();

        assert!(check(Task::Ingest, &settings, Some(dir.path())).is_ok());
        assert!(matches!(
            check(Task::Ingest, &settings, Some(&dir.path().join("missing"))),
            Err(DocgateError::NotFound(_))
        ));
    }
}
