//! docgate CLI entry point.

use anyhow::Result;
use clap::Parser;
use docgate::cli::{commands, Cli, Commands};
use docgate::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Logs go to stderr; stdout carries MCP traffic and command output.
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("docgate={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let settings = Settings::load_from(cli.config.as_ref())?;

    match cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings, cli.config.as_deref()).await?;
        }

        Commands::Db { action } => {
            commands::run_db(&action, settings).await?;
        }

        Commands::Ingest {
            source,
            collection,
            no_captions,
            json,
        } => {
            commands::run_ingest(source, collection, no_captions, json, settings).await?;
        }

        Commands::Search {
            query,
            limit,
            content_type,
            grouped,
        } => {
            commands::run_search(&query, limit, content_type.as_deref(), grouped, settings).await?;
        }

        Commands::List { limit } => {
            commands::run_list(limit, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(&host, port, settings).await?;
        }

        Commands::Mcp { server } => {
            commands::run_mcp(server, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, cli.config)?;
        }
    }

    Ok(())
}
