//! HTTP surface for the chunking engine.
//!
//! - `GET /health` – liveness and tokenizer in use
//! - `POST /chunk` – chunk one document, optionally with per-request settings
//! - `POST /chunk/batch` – chunk many documents concurrently
//! - `GET /chunk/strategies` – available strategies in precedence order

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use handlers::{ApiError, AppState};

/// Build the HTTP router with tracing and CORS layers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/chunk", post(handlers::chunk_document))
        .route("/chunk/batch", post(handlers::chunk_batch))
        .route("/chunk/strategies", get(handlers::list_strategies))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
