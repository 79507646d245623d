//! Search command implementation.

use crate::cli::preflight::{self, Task};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::vector_store::ContentType;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    limit: usize,
    content_type: Option<&str>,
    grouped: bool,
    settings: Settings,
) -> Result<()> {
    let content_type = content_type.map(str::parse::<ContentType>).transpose()?;
    preflight::check(Task::Search, &settings, None)?;

    let retriever = Orchestrator::new(settings)?.retriever();

    if grouped {
        let results = retriever.search_grouped(query, limit).await?;
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    let spinner = Output::spinner("Searching...");
    let results = retriever.search(query, limit, content_type).await;
    spinner.finish_and_clear();

    match results {
        Ok(results) => {
            if results.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", results.len()));

                for result in &results {
                    Output::search_result(
                        result.unit.content_type.as_str(),
                        &result.unit.source_document,
                        result.unit.page,
                        result.score,
                        &result.unit.content,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
