//! Configuration types for chunking.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::{
    DEFAULT_MAX_CONCURRENT_DOCUMENTS, DEFAULT_MAX_TOKENS, DEFAULT_MIN_TOKENS,
    DEFAULT_OVERLAP_TOKENS, DEFAULT_PORT,
};

/// How an isolated table is rendered into chunk content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    /// Normalized Markdown grid (header, separator, rows)
    #[default]
    Markdown,
    /// One `header: value, ...` line per data row
    RowSentences,
}

/// Token budget and classification settings for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Floor below which a window is merged backward when possible
    pub min_tokens: usize,

    /// Hard ceiling on chunk content tokens
    pub max_tokens: usize,

    /// Trailing tokens of one chunk repeated at the start of the next
    pub overlap_tokens: usize,

    /// tiktoken encoding used for counting
    pub encoding: String,

    /// Separator used when joining heading paths into breadcrumbs
    pub breadcrumb_separator: String,

    /// Minimum number of `【…】` markers that classifies a document as legal
    pub legal_marker_min_count: usize,

    /// Table/segment ratio that must be exceeded for the tabular strategy
    pub tabular_ratio_threshold: f64,

    /// Share of heading transitions that must be regular for the hierarchical strategy
    pub heading_consistency_threshold: f64,

    /// Breadcrumb depth for strategies without full breadcrumb emphasis
    pub shallow_breadcrumb_depth: usize,

    /// Source-name fragments that force the legal strategy
    pub legal_source_keywords: Vec<String>,

    /// Source-name fragments that force the tabular strategy
    pub tabular_source_keywords: Vec<String>,

    /// Table rendering
    pub table_format: TableFormat,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_tokens: DEFAULT_MIN_TOKENS,
            max_tokens: DEFAULT_MAX_TOKENS,
            overlap_tokens: DEFAULT_OVERLAP_TOKENS,
            encoding: "cl100k_base".to_string(),
            breadcrumb_separator: " > ".to_string(),
            legal_marker_min_count: 2,
            tabular_ratio_threshold: 0.5,
            heading_consistency_threshold: 0.8,
            shallow_breadcrumb_depth: 2,
            legal_source_keywords: ["[민사]", "[형사]", "[행정]", "[특허]", "판례"]
                .into_iter()
                .map(String::from)
                .collect(),
            tabular_source_keywords: ["재정동향", "통화신용정책", "현황"]
                .into_iter()
                .map(String::from)
                .collect(),
            table_format: TableFormat::Markdown,
        }
    }
}

impl ChunkingConfig {
    /// Create a config with the given token budget and default classification settings.
    pub fn with_tokens(min_tokens: usize, max_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            min_tokens,
            max_tokens,
            overlap_tokens,
            ..Default::default()
        }
    }

    /// Set the table format.
    pub fn with_table_format(mut self, format: TableFormat) -> Self {
        self.table_format = format;
        self
    }

    /// Check the budget invariants: `0 <= overlap < max` and `min <= max`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tokens == 0 {
            return Err(ConfigError::ZeroMaxTokens);
        }
        if self.overlap_tokens >= self.max_tokens {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.overlap_tokens,
                max: self.max_tokens,
            });
        }
        if self.min_tokens > self.max_tokens {
            return Err(ConfigError::MinAboveMax {
                min: self.min_tokens,
                max: self.max_tokens,
            });
        }
        for (name, value) in [
            ("tabular_ratio_threshold", self.tabular_ratio_threshold),
            (
                "heading_consistency_threshold",
                self.heading_consistency_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        Ok(())
    }

    /// Load configuration from an optional file layered under `CHUNKER_*` environment variables.
    ///
    /// Missing keys keep their defaults. The result is validated before it is returned.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("CHUNKER").try_parsing(true))
            .build()?;

        let loaded: ChunkingConfig = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load configuration from the environment, honouring `CHUNKER_CONFIG` as a file path.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("CHUNKER_CONFIG").ok();
        Self::load(path.as_deref().map(Path::new))
    }
}

/// Settings for the HTTP service and batch worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Port to listen on
    pub port: u16,

    /// Documents chunked concurrently by the batch processor
    pub max_concurrent_documents: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_concurrent_documents: DEFAULT_MAX_CONCURRENT_DOCUMENTS,
        }
    }
}

impl ServiceConfig {
    /// Load service settings from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            max_concurrent_documents: std::env::var("MAX_CONCURRENT_DOCUMENTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONCURRENT_DOCUMENTS),
        }
    }
}
