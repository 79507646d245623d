//! CLI module for docgate.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// docgate - SQL gateway and multimodal document ingestion
///
/// Exposes a relational database through a fixed set of safe CRUD operations
/// and turns a folder of PDFs into searchable text, image and table units.
#[derive(Parser, Debug)]
#[command(name = "docgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "DOCGATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check configuration, credentials and storage
    Doctor,

    /// Run gateway operations against the configured database
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Extract, describe, embed and store every document in a folder
    Ingest {
        /// Source folder (defaults to ingestion.source_dir)
        source: Option<PathBuf>,

        /// Target collection (defaults to ingestion.collection)
        #[arg(long)]
        collection: Option<String>,

        /// Use the fallback description instead of a vision model for images
        #[arg(long)]
        no_captions: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Semantic search over ingested units
    Search {
        /// Search query
        query: String,

        /// Number of nearest units
        #[arg(short = 'k', long, default_value = "5")]
        limit: usize,

        /// Only show units of this type (text, image, table)
        #[arg(short = 't', long = "type")]
        content_type: Option<String>,

        /// Print grouped multimodal results as JSON
        #[arg(long)]
        grouped: bool,
    },

    /// List ingested units in insertion order
    List {
        /// Maximum number of units
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Start an MCP server on stdio
    Mcp {
        /// Which tool set to serve
        #[arg(value_enum)]
        server: McpServerKind,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum McpServerKind {
    /// Gateway operations (create_record, read_records, ...)
    Database,
    /// Document retrieval (search_documents, get_document, list_documents)
    Documents,
}

#[derive(Subcommand, Debug)]
pub enum DbAction {
    /// Insert a record
    Create {
        table: String,
        /// Column values as a JSON object
        #[arg(short, long)]
        data: String,
    },

    /// Read records
    Read {
        table: String,
        /// Equality filters as a JSON object
        #[arg(short, long)]
        filters: Option<String>,
        /// Maximum rows
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Update records matching all filters
    Update {
        table: String,
        /// Equality filters as a JSON object
        #[arg(short, long)]
        filters: String,
        /// New column values as a JSON object
        #[arg(short, long)]
        data: String,
    },

    /// Run a read-only SELECT query
    Query { sql: String },

    /// List tables
    Tables,

    /// Describe a table's columns
    Describe { table: String },

    /// Invoke an operation by tool name with JSON arguments
    Call {
        tool: String,
        /// Arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
