//! Ingest command implementation.

use crate::cli::preflight::{self, Task};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

/// Run the ingest command.
pub async fn run_ingest(
    source: Option<PathBuf>,
    collection: Option<String>,
    no_captions: bool,
    json: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Some(collection) = collection {
        settings.ingestion.collection = collection;
    }
    if no_captions {
        settings.captioning.enabled = false;
    }

    preflight::check(Task::Ingest, &settings, source.as_deref())?;

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = if json {
        None
    } else {
        Some(Output::spinner("Extracting, describing and embedding documents..."))
    };
    let result = orchestrator.ingest(source.as_deref()).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    Output::header(&format!("Ingested into '{}'", report.collection));
    println!();
    for doc in &report.documents {
        Output::stage_row(&doc.document, &doc.text, &doc.images, &doc.tables);
    }
    for skipped in &report.skipped {
        Output::list_item(&format!("{} (skipped, unsupported type)", skipped));
    }
    println!();

    Output::kv("Documents", &report.documents.len().to_string());
    Output::kv("Units appended", &report.units_appended.to_string());

    let failed = report.failed_stages();
    if failed > 0 {
        for doc in report.documents.iter().filter(|d| d.has_failures()) {
            for (stage, outcome) in [("text", &doc.text), ("images", &doc.images), ("tables", &doc.tables)] {
                if outcome.is_failed() {
                    Output::warning(&format!("{} {}: {}", doc.document, stage, outcome));
                }
            }
        }
        Output::warning(&format!("{} stage(s) failed; other stages were kept.", failed));
    } else {
        Output::success("Done.");
    }

    Ok(())
}
