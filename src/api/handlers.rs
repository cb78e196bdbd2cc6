//! HTTP request handlers for the chunking service.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::batch::{BatchProcessor, BatchResult};
use crate::engine::AdaptiveChunker;
use crate::error::{ChunkingError, ConfigError};
use crate::types::{Chunk, ChunkingConfig, ChunkingStrategy, Document};

/// Application state shared across handlers.
pub struct AppState {
    pub chunker: Arc<AdaptiveChunker>,
    pub batch: BatchProcessor,
}

impl AppState {
    pub fn new(chunker: Arc<AdaptiveChunker>, batch: BatchProcessor) -> Self {
        Self { chunker, batch }
    }

    fn chunker_for(&self, config: Option<ChunkingConfig>) -> Result<Arc<AdaptiveChunker>, ConfigError> {
        match config {
            Some(config) => Ok(Arc::new(self.chunker.reconfigured(config)?)),
            None => Ok(Arc::clone(&self.chunker)),
        }
    }
}

/// Errors returned by the HTTP surface.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unprocessable(String),
    Internal(String),
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<ChunkingError> for ApiError {
    fn from(e: ChunkingError) -> Self {
        match e {
            ChunkingError::Config(e) => e.into(),
            e @ ChunkingError::Invariant { .. } => ApiError::Unprocessable(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    tokenizer: String,
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tokenizer: state.chunker.tokenizer().to_string(),
    })
}

/// Request body for `POST /chunk`.
#[derive(Debug, Deserialize)]
pub struct ChunkRequest {
    #[serde(flatten)]
    pub document: Document,
    /// Settings for this request only; missing fields take their defaults
    #[serde(default)]
    pub config: Option<ChunkingConfig>,
}

/// Response body for `POST /chunk`.
#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub source: String,
    pub strategy: ChunkingStrategy,
    pub total_chunks: usize,
    pub chunks: Vec<Chunk>,
}

/// Chunk a single document.
pub async fn chunk_document(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChunkRequest>,
) -> Result<Json<ChunkResponse>, ApiError> {
    let ChunkRequest { document, config } = request;
    let chunker = state.chunker_for(config)?;

    info!(
        source = %document.source,
        segments = document.segments.len(),
        "Received chunk request"
    );

    let source = document.source.clone();
    let (classification, chunks) =
        tokio::task::spawn_blocking(move || chunker.chunk_classified(&document))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(ChunkResponse {
        source,
        strategy: classification.strategy,
        total_chunks: chunks.len(),
        chunks,
    }))
}

/// Request body for `POST /chunk/batch`.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub documents: Vec<Document>,
}

/// Per-document entry in a batch response.
#[derive(Debug, Serialize)]
pub struct BatchDocumentResponse {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<Chunk>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body for `POST /chunk/batch`.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchDocumentResponse>,
    pub summary: BatchResult,
}

/// Chunk many documents concurrently.
pub async fn chunk_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Json<BatchResponse> {
    let (outcomes, summary) = state.batch.process_batch(request.documents).await;
    if summary.failed_documents > 0 {
        warn!(failed = summary.failed_documents, "Batch finished with failures");
    }

    let results = outcomes
        .into_iter()
        .map(|outcome| match outcome.result {
            Ok(chunks) => BatchDocumentResponse {
                source: outcome.source,
                chunks: Some(chunks),
                error: None,
            },
            Err(e) => BatchDocumentResponse {
                source: outcome.source,
                chunks: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    Json(BatchResponse { results, summary })
}

/// Strategy descriptor for `GET /chunk/strategies`.
#[derive(Debug, Serialize)]
pub struct StrategyInfo {
    name: &'static str,
    description: &'static str,
}

/// List available chunking strategies in precedence order.
pub async fn list_strategies() -> Json<Vec<StrategyInfo>> {
    Json(
        ChunkingStrategy::ALL
            .iter()
            .map(|s| StrategyInfo {
                name: s.name(),
                description: s.description(),
            })
            .collect(),
    )
}
