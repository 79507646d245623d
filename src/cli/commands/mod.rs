//! CLI command implementations.

mod config;
mod db;
mod doctor;
mod ingest;
mod list;
mod mcp;
mod search;
mod serve;

pub use config::run_config;
pub use db::run_db;
pub use doctor::run_doctor;
pub use ingest::run_ingest;
pub use list::run_list;
pub use mcp::run_mcp;
pub use search::run_search;
pub use serve::run_serve;
