//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for gateway operations and document search.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::DocgateError;
use crate::gateway::{Gateway, OperationResult};
use crate::mcp::{DatabaseTools, DocumentTools, SearchDocumentsArgs, ToolSet};
use crate::orchestrator::Orchestrator;
use crate::retrieval::{GroupedResults, ResponsePart, DEFAULT_K};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    database: DatabaseTools,
    documents: DocumentTools,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let gateway = Gateway::connect(&settings.database).await;
    if !gateway.is_connected() {
        Output::warning("Database unavailable; gateway endpoints will report not connected.");
    }
    let retriever = Orchestrator::new(settings)?.retriever();

    let state = Arc::new(AppState {
        database: DatabaseTools::new(gateway),
        documents: DocumentTools::new(retriever),
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("docgate API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Tools", "GET  /tools");
    Output::kv("Gateway", "POST /gateway/:tool");
    Output::kv("Search", "POST /search");
    Output::kv("Multimodal", "POST /search/multimodal");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state.clone())).await?;

    if let Ok(state) = Arc::try_unwrap(state) {
        state.database.into_gateway().close().await;
    }
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/gateway/{tool}", post(gateway_call))
        .route("/search", post(search))
        .route("/search/multimodal", post(search_multimodal))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct MultimodalRequest {
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_K
}

#[derive(Serialize)]
struct MultimodalResponse {
    results: GroupedResults,
    parts: Vec<ResponsePart>,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error,
        }),
    )
        .into_response()
}

fn docgate_error(e: DocgateError) -> Response {
    let status = match e {
        DocgateError::NotFound(_) => StatusCode::NOT_FOUND,
        DocgateError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e.to_string())
}

/// HTTP status for a gateway result.
fn gateway_status(result: &OperationResult) -> StatusCode {
    match result.error_kind {
        None => StatusCode::OK,
        Some("validation") => StatusCode::BAD_REQUEST,
        Some("permission") => StatusCode::FORBIDDEN,
        Some("not_found") => StatusCode::NOT_FOUND,
        Some("connection") => StatusCode::SERVICE_UNAVAILABLE,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "database": state.database.gateway().is_connected(),
        "collection": state.documents.retriever().collection(),
    }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "database": state.database.tools(),
        "documents": state.documents.tools(),
    }))
}

async fn gateway_call(
    State(state): State<Arc<AppState>>,
    Path(tool): Path<String>,
    body: Bytes,
) -> Response {
    let arguments = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Some(value),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e)),
        }
    };

    let result = state.database.gateway().dispatch(&tool, arguments).await;
    (gateway_status(&result), Json(result)).into_response()
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchDocumentsArgs>,
) -> Response {
    match state.documents.search_documents(req).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => docgate_error(e),
    }
}

async fn search_multimodal(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MultimodalRequest>,
) -> Response {
    match state.documents.retriever().search_grouped(&req.query, req.limit).await {
        Ok(results) => {
            let parts = results.render_parts();
            Json(MultimodalResponse { results, parts }).into_response()
        }
        Err(e) => docgate_error(e),
    }
}
