//! MCP server implementation.

use super::protocol::*;
use super::tools::ToolSet;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC server over line-delimited stdio for one tool set.
pub struct McpServer<T: ToolSet> {
    tools: T,
}

impl<T: ToolSet> McpServer<T> {
    pub fn new(tools: T) -> Self {
        Self { tools }
    }

    pub fn into_tools(self) -> T {
        self.tools
    }

    /// Run on stdin/stdout. Logs go to stderr.
    pub async fn run(&self) -> anyhow::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_with(stdin.lock(), stdout.lock()).await
    }

    /// Serve requests from `reader` until EOF, one JSON document per line.
    pub async fn run_with<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> anyhow::Result<()> {
        info!("{} MCP server starting", self.tools.server_name());

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    warn!("Failed to parse request: {}", e);
                    Some(JsonRpcResponse::error(None, PARSE_ERROR, "Parse error"))
                }
            };

            if let Some(response) = response {
                writeln!(writer, "{}", serde_json::to_string(&response)?)?;
                writer.flush()?;
            }
        }

        info!("{} MCP server stopped", self.tools.server_name());
        Ok(())
    }

    /// Handle a single JSON-RPC message. Notifications yield `None`.
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("MCP request: {}", request.method);

        if request.is_notification() {
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => JsonRpcResponse::from_serializable(
                request.id,
                &ToolsListResult {
                    tools: self.tools.tools(),
                },
            ),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
            ),
        };

        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: self.tools.server_name().to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };

        JsonRpcResponse::from_serializable(id, &result)
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, INVALID_PARAMS, &format!("Invalid params: {}", e))
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let result = self.tools.call(&params.name, params.arguments).await;
        if result.is_error() {
            debug!("Tool '{}' returned an error", params.name);
        }

        JsonRpcResponse::from_serializable(id, &result)
    }
}
