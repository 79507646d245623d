//! MCP (Model Context Protocol) servers for docgate.
//!
//! Two tool sets: gateway operations and document retrieval.
//! Implements JSON-RPC 2.0 over stdio.

mod protocol;
mod server;
mod tools;

pub use protocol::{Tool, ToolCallResult};
pub use server::McpServer;
pub use tools::{
    gateway_tool, preview, DatabaseTools, DocumentTools, GetDocumentArgs, ListDocumentsArgs,
    SearchDocumentsArgs, ToolSet,
};
