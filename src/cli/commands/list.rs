//! List command implementation.

use crate::cli::preflight::{self, Task};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(limit: usize, settings: Settings) -> Result<()> {
    preflight::check(Task::List, &settings, None)?;

    let orchestrator = Orchestrator::new(settings)?;
    let collection = orchestrator.settings().ingestion.collection.clone();

    if orchestrator.vector_store().collection(&collection).await?.is_none() {
        Output::info("Nothing ingested yet. Use 'docgate ingest <folder>' to add documents.");
        return Ok(());
    }

    let total = orchestrator.vector_store().count(&collection).await?;
    match orchestrator.retriever().list(limit).await {
        Ok(units) => {
            Output::header(&format!("Collection '{}' ({} units)", collection, total));
            println!();

            for unit in &units {
                Output::unit_info(
                    unit.content_type.as_str(),
                    &unit.source_document,
                    unit.page,
                    &unit.id.to_string(),
                    &unit.content,
                );
            }

            if total > units.len() {
                println!();
                Output::kv("Showing", &format!("{} of {}", units.len(), total));
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list units: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
