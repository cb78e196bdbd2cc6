//! Adaptive Chunker Library
//!
//! Structure-aware chunking of parsed documents for RAG pipelines. A document
//! is classified into a chunking strategy (legal, tabular, hierarchical or
//! fallback), its prose is split into Korean-aware sentences and grouped into
//! token-bounded overlapping windows, tables are kept whole, and every chunk
//! carries its heading breadcrumb and provenance.

pub mod api;
pub mod batch;
pub mod chunkers;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod router;
pub mod types;

pub use batch::{BatchConfig, BatchProcessor, BatchResult};
pub use engine::AdaptiveChunker;
pub use error::{ChunkingError, ConfigError, SegmentationError};
pub use router::{Classification, StrategyClassifier};
pub use types::{Chunk, ChunkingConfig, ChunkingStrategy, Document, HeadingPath, Segment};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batch::*;
    pub use crate::chunkers::{SentenceSplitter, TokenCounter};
    pub use crate::engine::AdaptiveChunker;
    pub use crate::error::*;
    pub use crate::router::{Classification, StrategyClassifier};
    pub use crate::types::*;
}

/// Default minimum tokens per chunk
pub const DEFAULT_MIN_TOKENS: usize = 100;

/// Default maximum tokens per chunk
pub const DEFAULT_MAX_TOKENS: usize = 500;

/// Default overlap between consecutive chunks in tokens
pub const DEFAULT_OVERLAP_TOKENS: usize = 50;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3017;

/// Default number of documents chunked concurrently in a batch
pub const DEFAULT_MAX_CONCURRENT_DOCUMENTS: usize = 4;
