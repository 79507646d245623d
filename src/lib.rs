//! docgate - SQL gateway and multimodal document ingestion for AI agents
//!
//! # Overview
//!
//! docgate provides two components:
//! - A tabular data gateway: a fixed set of CRUD-shaped operations over one
//!   SQLite or PostgreSQL connection, with no delete and read-only raw queries
//! - A document ingestion pipeline: text, embedded images and tables are
//!   extracted from PDFs, described, embedded and appended to a vector store
//!
//! Both are exposed as MCP tool servers, an HTTP API and a CLI.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `gateway` - Operation requests, results and SQL backends
//! - `ingestion` - Loaders, table detection, captioning and the pipeline
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector store abstraction
//! - `retrieval` - Semantic search and multimodal responses
//! - `mcp` - JSON-RPC tool servers
//! - `orchestrator` - Wiring from settings
//!
//! # Example
//!
//! ```rust,no_run
//! use docgate::config::Settings;
//! use docgate::gateway::{fields, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let gateway = Gateway::connect(&settings.database).await;
//!
//!     let result = gateway.create("users", fields([("name", "Ada")])).await;
//!     println!("{}", result.to_json());
//!
//!     gateway.close().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod gateway;
pub mod ingestion;
pub mod mcp;
pub mod openai;
pub mod orchestrator;
pub mod retrieval;
pub mod vector_store;

pub use error::{DocgateError, Result};
