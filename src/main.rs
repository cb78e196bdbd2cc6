//! Adaptive Chunker Service - Main Entry Point
//!
//! Serves the chunking engine over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use adaptive_chunker::api::{self, AppState};
use adaptive_chunker::batch::{BatchConfig, BatchProcessor};
use adaptive_chunker::types::{ChunkingConfig, ServiceConfig};
use adaptive_chunker::AdaptiveChunker;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ChunkingConfig::from_env().context("failed to load chunking configuration")?;
    let service = ServiceConfig::from_env();

    info!("Starting Adaptive Chunker v{}", env!("CARGO_PKG_VERSION"));
    info!(
        min_tokens = config.min_tokens,
        max_tokens = config.max_tokens,
        overlap_tokens = config.overlap_tokens,
        encoding = %config.encoding,
        "Chunking budget"
    );

    let chunker = Arc::new(AdaptiveChunker::new(config)?);
    let batch = BatchProcessor::new(
        Arc::clone(&chunker),
        BatchConfig {
            concurrency: service.max_concurrent_documents,
            ..Default::default()
        },
    );
    let app = api::create_router(Arc::new(AppState::new(chunker, batch)));

    let addr = SocketAddr::from(([0, 0, 0, 0], service.port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the subscriber; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("adaptive_chunker=info,tower_http=debug"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
