//! Tool sets served over MCP.

use super::protocol::{Tool, ToolCallResult};
use crate::error::{DocgateError, Result};
use crate::gateway::{Gateway, Operation};
use crate::retrieval::{Retriever, DEFAULT_K};
use crate::vector_store::{ContentType, ExtractedUnit};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const PREVIEW_CHARS: usize = 200;
const DEFAULT_LIST_LIMIT: usize = 20;

/// A named group of tools behind one MCP server.
#[async_trait]
pub trait ToolSet: Send + Sync {
    /// Server name reported on initialize.
    fn server_name(&self) -> &'static str;

    fn tools(&self) -> Vec<Tool>;

    async fn call(&self, name: &str, arguments: Option<Value>) -> ToolCallResult;
}

/// Gateway operations as tools.
pub struct DatabaseTools {
    gateway: Gateway,
}

impl DatabaseTools {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn into_gateway(self) -> Gateway {
        self.gateway
    }
}

/// Input schema for one gateway operation.
pub fn gateway_tool(operation: Operation) -> Tool {
    let scalar_map = json!({
        "type": "object",
        "additionalProperties": {"type": ["string", "number", "integer", "boolean", "null"]}
    });
    let table = json!({"type": "string", "description": "Table name"});

    let (description, schema) = match operation {
        Operation::Create => (
            "Insert a new record into a table. Returns the id assigned by the database.",
            json!({
                "type": "object",
                "properties": {"table": table, "data": scalar_map},
                "required": ["table", "data"]
            }),
        ),
        Operation::Read => (
            "Read records from a table, optionally filtered by column equality.",
            json!({
                "type": "object",
                "properties": {
                    "table": table,
                    "filters": scalar_map,
                    "limit": {"type": "integer", "description": "Maximum rows", "default": 100}
                },
                "required": ["table"]
            }),
        ),
        Operation::Update => (
            "Update the records matching all filters. Returns the number of rows affected.",
            json!({
                "type": "object",
                "properties": {"table": table, "filters": scalar_map, "data": scalar_map},
                "required": ["table", "filters", "data"]
            }),
        ),
        Operation::ListTables => (
            "List the tables in the database.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
        Operation::DescribeTable => (
            "Describe the columns of a table.",
            json!({
                "type": "object",
                "properties": {"table": table},
                "required": ["table"]
            }),
        ),
        Operation::RawQuery => (
            "Run a read-only SQL query. Only statements starting with SELECT are accepted.",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string", "description": "SELECT statement"}},
                "required": ["query"]
            }),
        ),
    };

    Tool {
        name: operation.tool_name().to_string(),
        description: description.to_string(),
        input_schema: schema,
    }
}

#[async_trait]
impl ToolSet for DatabaseTools {
    fn server_name(&self) -> &'static str {
        "docgate-database"
    }

    fn tools(&self) -> Vec<Tool> {
        Operation::ALL.iter().map(|op| gateway_tool(*op)).collect()
    }

    async fn call(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        let result = self.gateway.dispatch(name, arguments).await;
        let text = result.to_json();
        if result.success {
            ToolCallResult::text(text)
        } else {
            ToolCallResult::error(text)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchDocumentsArgs {
    pub query: String,
    #[serde(default = "default_k")]
    pub limit: usize,
    #[serde(default)]
    pub content_type: Option<ContentType>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetDocumentArgs {
    pub document_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListDocumentsArgs {
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_k() -> usize {
    DEFAULT_K
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

/// Document retrieval as tools.
pub struct DocumentTools {
    retriever: Retriever,
}

impl DocumentTools {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn search_documents(&self, args: SearchDocumentsArgs) -> Result<Value> {
        let results = self
            .retriever
            .search(&args.query, args.limit, args.content_type)
            .await?;

        let documents: Vec<Value> = results
            .iter()
            .map(|r| {
                json!({
                    "id": r.unit.id.to_string(),
                    "content": r.unit.content,
                    "source": r.unit.source_document,
                    "metadata": r.unit.metadata(),
                    "score": r.score,
                })
            })
            .collect();

        Ok(json!({
            "success": true,
            "query": args.query,
            "count": documents.len(),
            "documents": documents,
        }))
    }

    pub async fn get_document(&self, args: GetDocumentArgs) -> Result<Value> {
        match self.retriever.get(&args.document_id).await? {
            Some(unit) => Ok(json!({
                "success": true,
                "document": {
                    "id": unit.id.to_string(),
                    "content": unit.content,
                    "source": unit.source_document,
                    "metadata": unit.metadata(),
                },
            })),
            None => Err(DocgateError::NotFound(format!(
                "Document with ID '{}' not found",
                args.document_id
            ))),
        }
    }

    pub async fn list_documents(&self, args: ListDocumentsArgs) -> Result<Value> {
        let units = self.retriever.list(args.limit).await?;
        let documents: Vec<Value> = units.iter().map(summary).collect();

        Ok(json!({
            "success": true,
            "count": documents.len(),
            "documents": documents,
        }))
    }
}

fn summary(unit: &ExtractedUnit) -> Value {
    json!({
        "id": unit.id.to_string(),
        "source": unit.source_document,
        "metadata": unit.metadata(),
        "content_preview": preview(&unit.content),
    })
}

/// First 200 characters, with an ellipsis when cut.
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: Option<Value>) -> Result<T> {
    let args = match arguments {
        None | Some(Value::Null) => json!({}),
        Some(v) => v,
    };
    serde_json::from_value(args).map_err(|e| DocgateError::InvalidInput(e.to_string()))
}

#[async_trait]
impl ToolSet for DocumentTools {
    fn server_name(&self) -> &'static str {
        "docgate-documents"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "search_documents".to_string(),
                description: "Semantic search over ingested document text, image descriptions and tables."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Search query"},
                        "limit": {"type": "integer", "description": "Maximum number of results", "default": 5},
                        "content_type": {
                            "type": "string",
                            "enum": ["text", "image", "table"],
                            "description": "Only return units of this type"
                        }
                    },
                    "required": ["query"]
                }),
            },
            Tool {
                name: "get_document".to_string(),
                description: "Fetch one ingested unit by its id.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "document_id": {"type": "string", "description": "Unit id"}
                    },
                    "required": ["document_id"]
                }),
            },
            Tool {
                name: "list_documents".to_string(),
                description: "List ingested units with a short content preview.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "limit": {"type": "integer", "description": "Maximum number of units", "default": 20}
                    },
                    "required": []
                }),
            },
        ]
    }

    async fn call(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        let outcome = match name {
            "search_documents" => match parse_args(arguments) {
                Ok(args) => self.search_documents(args).await,
                Err(e) => Err(e),
            },
            "get_document" => match parse_args(arguments) {
                Ok(args) => self.get_document(args).await,
                Err(e) => Err(e),
            },
            "list_documents" => match parse_args(arguments) {
                Ok(args) => self.list_documents(args).await,
                Err(e) => Err(e),
            },
            _ => return ToolCallResult::error(format!("Unknown tool: {}", name)),
        };

        match outcome {
            Ok(value) => ToolCallResult::json(&value),
            Err(e) => {
                debug!("{} failed: {}", name, e);
                ToolCallResult::json(&json!({"success": false, "error": e.to_string()}))
            }
        }
    }
}
