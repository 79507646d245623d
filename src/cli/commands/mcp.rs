//! MCP command implementation.

use crate::cli::McpServerKind;
use crate::config::Settings;
use crate::gateway::Gateway;
use crate::mcp::{DatabaseTools, DocumentTools, McpServer};
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the selected MCP server until stdin closes.
pub async fn run_mcp(kind: McpServerKind, settings: Settings) -> Result<()> {
    match kind {
        McpServerKind::Database => {
            let gateway = Gateway::connect(&settings.database).await;
            let server = McpServer::new(DatabaseTools::new(gateway));
            server.run().await?;
            server.into_tools().into_gateway().close().await;
        }
        McpServerKind::Documents => {
            let retriever = Orchestrator::new(settings)?.retriever();
            McpServer::new(DocumentTools::new(retriever)).run().await?;
        }
    }
    Ok(())
}
