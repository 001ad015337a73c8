//! HTTP boundary for the ragline pipeline.
//!
//! Three routes under `/api/rag` map onto the three core flows; every
//! [`RaglineError`] is translated into a `{error, details}` envelope with
//! the error's stable category, so provider internals never leak into
//! responses.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use ragline_core::{
    AnswerResult, Deindexer, DeindexOutcome, IngestionPipeline, RaglineError,
    RetrievalOrchestrator, Source,
};

/// Shared handles to the three pipeline flows.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub deindexer: Arc<Deindexer>,
    pub orchestrator: Arc<RetrievalOrchestrator>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8088,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/rag/index", post(index_source))
        .route("/api/rag/deindex", delete(deindex_source))
        .route("/api/rag/query", post(query))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for ragline server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("ragline listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "ragline"}))
}

// ── Request/response shapes ────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexResponse {
    success: bool,
    source_id: String,
    chunk_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeindexRequest {
    #[serde(default)]
    source_id: String,
}

#[derive(Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
enum DeindexResponse {
    Removed {
        success: bool,
        source_id: String,
        deleted_count: usize,
        point_ids: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation_id: Option<u64>,
    },
    NoMatch {
        success: bool,
        source_id: String,
        message: String,
        deleted_count: usize,
        available_source_ids: Vec<String>,
    },
}

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: String,
}

#[derive(Serialize)]
struct QueryResponse {
    success: bool,
    #[serde(flatten)]
    result: AnswerResult,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: &'static str,
    details: String,
}

type ApiError = (StatusCode, Json<ErrorEnvelope>);

/// Map a core error to the HTTP envelope. Input problems are the caller's
/// fault; everything else is a dependency or pipeline failure.
fn into_api_error(e: RaglineError) -> ApiError {
    let status = match e.category() {
        "validation" | "empty_query" | "unsupported_source_type" | "config" => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(category = e.category(), error = %e, "request failed");
    (
        status,
        Json(ErrorEnvelope {
            error: e.category(),
            details: e.to_string(),
        }),
    )
}

fn bad_request(details: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorEnvelope {
            error: "validation",
            details: details.into(),
        }),
    )
}

// ── Handlers ───────────────────────────────────────────────────────

async fn index_source(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<IndexResponse>, ApiError> {
    let source: Source = serde_json::from_value(body)
        .map_err(|e| bad_request(format!("invalid source body: {e}")))?;

    let report = state
        .pipeline
        .ingest(&source)
        .await
        .map_err(into_api_error)?;

    Ok(Json(IndexResponse {
        success: true,
        source_id: report.source_id,
        chunk_count: report.chunk_count,
    }))
}

async fn deindex_source(
    State(state): State<AppState>,
    Json(request): Json<DeindexRequest>,
) -> Result<Json<DeindexResponse>, ApiError> {
    if request.source_id.trim().is_empty() {
        return Err(bad_request("sourceId is required"));
    }

    let outcome = state
        .deindexer
        .deindex(&request.source_id)
        .await
        .map_err(into_api_error)?;

    let response = match outcome {
        DeindexOutcome::Removed {
            deleted_count,
            point_ids,
            operation_id,
        } => DeindexResponse::Removed {
            success: true,
            source_id: request.source_id,
            deleted_count,
            point_ids,
            operation_id,
        },
        DeindexOutcome::NoMatch {
            available_source_ids,
        } => DeindexResponse::NoMatch {
            success: true,
            source_id: request.source_id,
            message: "no indexed points matched this source".to_string(),
            deleted_count: 0,
            available_source_ids,
        },
    };

    Ok(Json(response))
}

async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(bad_request("query is required"));
    }

    let result = state
        .orchestrator
        .answer(&request.query)
        .await
        .map_err(into_api_error)?;

    Ok(Json(QueryResponse {
        success: true,
        result,
    }))
}
