//! Batch processing utilities for chunking many documents.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::AdaptiveChunker;
use crate::error::ChunkingError;
use crate::types::{Chunk, Document};
use crate::DEFAULT_MAX_CONCURRENT_DOCUMENTS;

/// Configuration for batch processing.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum documents to chunk concurrently
    pub concurrency: usize,
    /// Whether to keep going after a document fails
    pub continue_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_MAX_CONCURRENT_DOCUMENTS,
            continue_on_error: true,
        }
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub total_documents: usize,
    pub processed_documents: usize,
    pub failed_documents: usize,
    pub total_chunks: usize,
    pub errors: Vec<BatchError>,
}

/// A document that failed during batch processing.
#[derive(Debug, Clone, Serialize)]
pub struct BatchError {
    pub source: String,
    pub error: String,
}

/// Outcome for one document, in input order.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub source: String,
    pub result: Result<Vec<Chunk>, BatchItemError>,
}

/// Why a single document produced no chunks.
#[derive(Debug, thiserror::Error)]
pub enum BatchItemError {
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    #[error("chunking task failed: {0}")]
    Task(String),
    #[error("skipped after an earlier failure")]
    Skipped,
}

/// Batch processor for chunking many documents at once.
///
/// Each document runs on the blocking pool; a failure never affects the
/// other documents' chunks.
pub struct BatchProcessor {
    chunker: Arc<AdaptiveChunker>,
    config: BatchConfig,
}

impl BatchProcessor {
    /// Create a new batch processor.
    pub fn new(chunker: Arc<AdaptiveChunker>, config: BatchConfig) -> Self {
        Self { chunker, config }
    }

    /// Chunk a batch of documents, returning one outcome per input document.
    ///
    /// With `continue_on_error` off, every document after the first failure is
    /// reported as skipped.
    pub async fn process_batch(&self, documents: Vec<Document>) -> (Vec<DocumentOutcome>, BatchResult) {
        let total_documents = documents.len();
        info!(
            total_documents,
            concurrency = self.config.concurrency,
            "Starting batch processing"
        );

        let concurrency = self.config.concurrency.max(1);
        let mut outcomes = Vec::with_capacity(total_documents);
        let mut halted = false;

        let mut results = stream::iter(documents.into_iter().map(|document| {
            let chunker = Arc::clone(&self.chunker);
            async move {
                let source = document.source.clone();
                let result = tokio::task::spawn_blocking(move || chunker.chunk(&document))
                    .await
                    .map_err(|e| BatchItemError::Task(e.to_string()))
                    .and_then(|r| r.map_err(BatchItemError::from));
                DocumentOutcome { source, result }
            }
        }))
        .buffered(concurrency);

        while let Some(outcome) = results.next().await {
            if halted {
                outcomes.push(DocumentOutcome {
                    source: outcome.source,
                    result: Err(BatchItemError::Skipped),
                });
                continue;
            }
            if let Err(e) = &outcome.result {
                warn!(source = %outcome.source, error = %e, "Failed to chunk document");
                halted = !self.config.continue_on_error;
            }
            outcomes.push(outcome);
        }

        let result = summarize(&outcomes);
        info!(
            processed = result.processed_documents,
            failed = result.failed_documents,
            chunks = result.total_chunks,
            "Batch processing complete"
        );

        (outcomes, result)
    }
}

fn summarize(outcomes: &[DocumentOutcome]) -> BatchResult {
    let mut result = BatchResult {
        total_documents: outcomes.len(),
        ..Default::default()
    };
    for outcome in outcomes {
        match &outcome.result {
            Ok(chunks) => {
                result.processed_documents += 1;
                result.total_chunks += chunks.len();
            }
            Err(e) => {
                result.failed_documents += 1;
                result.errors.push(BatchError {
                    source: outcome.source.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    result
}
