//! Error types for the chunking engine.

use thiserror::Error;

/// Errors raised while loading or validating a [`crate::types::ChunkingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The token ceiling must leave room for at least one token.
    #[error("max_tokens must be greater than zero")]
    ZeroMaxTokens,
    /// Overlap has to be strictly smaller than the ceiling or windows never advance.
    #[error("overlap_tokens ({overlap}) must be smaller than max_tokens ({max})")]
    OverlapTooLarge {
        /// Configured overlap.
        overlap: usize,
        /// Configured ceiling.
        max: usize,
    },
    /// The floor cannot sit above the ceiling.
    #[error("min_tokens ({min}) must not exceed max_tokens ({max})")]
    MinAboveMax {
        /// Configured floor.
        min: usize,
        /// Configured ceiling.
        max: usize,
    },
    /// A ratio-style threshold fell outside `[0, 1]`.
    #[error("{name} must be within [0, 1], got {value}")]
    ThresholdOutOfRange {
        /// Option name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// The tokenizer encoding could not be loaded.
    #[error("failed to load tokenizer encoding '{encoding}': {source}")]
    Tokenizer {
        /// Encoding name from the configuration.
        encoding: String,
        /// Underlying tiktoken error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A configuration source (file or environment) could not be read.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Failure reported by a pluggable sentence splitter.
///
/// This never aborts chunking; the segmenter degrades to punctuation splitting.
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// The splitter backend could not be reached or initialised.
    #[error("sentence splitter unavailable: {0}")]
    Unavailable(String),
    /// The splitter returned sentences that do not reproduce the input text.
    #[error("sentence splitter dropped or altered text")]
    ContentMismatch,
}

/// Errors that abort chunking of a single document.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Configuration was rejected before any processing started.
    #[error("invalid chunking configuration: {0}")]
    Config(#[from] ConfigError),
    /// An internal invariant broke; no chunks are returned for the document.
    #[error("chunking invariant violated for '{source_id}': {reason}")]
    Invariant {
        /// Document identifier.
        source_id: String,
        /// What went wrong.
        reason: String,
    },
}

impl ChunkingError {
    pub(crate) fn invariant(source_id: &str, reason: impl Into<String>) -> Self {
        Self::Invariant {
            source_id: source_id.to_string(),
            reason: reason.into(),
        }
    }
}
