//! Doctor command - verify credentials, storage and configuration.

use crate::cli::Output;
use crate::config::{EmbeddingProvider, Settings};
use crate::gateway::{Gateway, Payload};
use crate::vector_store::create_vector_store;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: Option<&Path>) -> anyhow::Result<()> {
    Output::header("docgate Doctor");
    println!();
    println!("Checking configuration, credentials and storage...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Configuration").bold());
    let api_check = check_openai_api_key(needs_openai(settings));
    api_check.print();
    checks.push(api_check);

    println!();

    println!("{}", style("Database").bold());
    let db_check = check_database(settings).await;
    db_check.print();
    checks.push(db_check);

    println!();

    println!("{}", style("Documents").bold());
    let doc_checks = check_documents(settings).await;
    for check in &doc_checks {
        check.print();
    }
    checks.extend(doc_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using docgate.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! docgate is ready to use.");
    }

    Ok(())
}

/// OpenAI is needed for OpenAI embeddings or image captions.
fn needs_openai(settings: &Settings) -> bool {
    settings.embedding.provider == EmbeddingProvider::OpenAI || settings.captioning.enabled
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key(required: bool) -> CheckResult {
    let missing = |message: &str| {
        if required {
            CheckResult::error("OPENAI_API_KEY", message, "Set with: export OPENAI_API_KEY='sk-...'")
        } else {
            CheckResult::ok("OPENAI_API_KEY", &format!("{} (not needed by current settings)", message))
        }
    };

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => missing("empty"),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => missing("not set"),
    }
}

/// Try the configured gateway connection.
async fn check_database(settings: &Settings) -> CheckResult {
    let name = format!("{} backend", settings.database.backend);
    let gateway = Gateway::connect(&settings.database).await;

    if !gateway.is_connected() {
        return CheckResult::error(
            &name,
            "connection failed",
            "Check database.sqlite_path or database.postgres_url (docgate config edit)",
        );
    }

    let result = gateway.list_tables().await;
    gateway.close().await;

    match result.payload {
        Some(Payload::Tables { count, .. }) => {
            CheckResult::ok(&name, &format!("connected ({} tables)", count))
        }
        _ => CheckResult::warning(
            &name,
            &format!(
                "connected, but listing tables failed: {}",
                result.error.unwrap_or_default()
            ),
            "Check that the database user can read the catalog",
        ),
    }
}

/// Source folder and vector store state.
async fn check_documents(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let source = settings.source_dir();
    if source.is_dir() {
        results.push(CheckResult::ok("Source folder", &format!("{}", source.display())));
    } else {
        results.push(CheckResult::warning(
            "Source folder",
            &format!("{} (missing)", source.display()),
            "Create it or pass a folder to: docgate ingest <folder>",
        ));
    }

    if settings.vector_store.provider.eq_ignore_ascii_case("sqlite") {
        let path = settings.vector_store_path();
        if path.exists() {
            let size = std::fs::metadata(&path)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "unknown size".to_string());
            results.push(CheckResult::ok("Vector store", &format!("{} ({})", path.display(), size)));
        } else {
            results.push(CheckResult::warning(
                "Vector store",
                &format!("{} (not created yet)", path.display()),
                "Created on first ingestion",
            ));
            return results;
        }
    }

    let collection = &settings.ingestion.collection;
    let store = match create_vector_store(&settings.vector_store) {
        Ok(store) => store,
        Err(e) => {
            results.push(CheckResult::error(
                "Vector store",
                &e.to_string(),
                "Check vector_store.provider and vector_store.sqlite_path",
            ));
            return results;
        }
    };

    match store.count(collection).await {
        Ok(0) => results.push(CheckResult::warning(
            "Collection",
            &format!("'{}' is empty", collection),
            "Run: docgate ingest",
        )),
        Ok(n) => results.push(CheckResult::ok(
            "Collection",
            &format!("'{}' ({} units)", collection, n),
        )),
        Err(e) => results.push(CheckResult::error(
            "Collection",
            &e.to_string(),
            "The vector store file may be corrupt",
        )),
    }

    results
}

/// Check if config file exists.
fn check_config_file(config_path: Option<&Path>) -> CheckResult {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_config_path);
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: docgate config edit",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_missing_key_only_fails_when_needed() {
        let mut settings = Settings::default();
        assert!(needs_openai(&settings));

        settings.embedding.provider = EmbeddingProvider::Ollama;
        settings.captioning.enabled = false;
        assert!(!needs_openai(&settings));
    }

    #[tokio::test]
    async fn test_check_database_with_sqlite_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.database.sqlite_path = dir.path().join("app.db").display().to_string();

        let check = check_database(&settings).await;
        assert_eq!(check.status, CheckStatus::Ok);
        assert!(check.message.contains("0 tables"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }
}
