//! Chunking strategy router.
//!
//! Classifies a parsed document into one of the fixed chunking strategies and
//! hands back the plan of structural units that strategy produces.

pub mod plan;

use serde::Serialize;
use tracing::debug;

use crate::types::{ChunkingConfig, ChunkingStrategy, HeadingPath, Segment, SegmentKind};
pub use plan::{
    Block, FallbackPlanner, HierarchicalPlanner, LegalPlanner, StructuralUnit, TabularPlanner,
    TextPiece, UnitPlanner,
};

/// Structural signals measured on a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSignals {
    /// Number of `【…】` section markers across all prose
    pub legal_markers: usize,
    /// The source name contains a legal keyword
    pub legal_source_hint: bool,
    /// The source name contains a tabular keyword
    pub tabular_source_hint: bool,
    /// Fraction of segments that are tables
    pub table_ratio: f64,
    /// Deepest heading path seen
    pub max_heading_depth: usize,
    /// Fraction of heading-path changes that descend at most one level
    pub heading_consistency: f64,
}

/// Result of classifying a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub strategy: ChunkingStrategy,
    pub signals: DocumentSignals,
}

/// Router that selects the chunking strategy for a document.
///
/// Precedence is fixed: legal, then tabular, then hierarchical, then fallback.
/// Classification is a pure function of the source name and segments.
#[derive(Debug, Clone)]
pub struct StrategyClassifier {
    legal_marker_min_count: usize,
    tabular_ratio_threshold: f64,
    heading_consistency_threshold: f64,
    legal_source_keywords: Vec<String>,
    tabular_source_keywords: Vec<String>,
}

impl StrategyClassifier {
    /// Create a classifier with the thresholds from `config`.
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            legal_marker_min_count: config.legal_marker_min_count,
            tabular_ratio_threshold: config.tabular_ratio_threshold,
            heading_consistency_threshold: config.heading_consistency_threshold,
            legal_source_keywords: config.legal_source_keywords.clone(),
            tabular_source_keywords: config.tabular_source_keywords.clone(),
        }
    }

    /// Pick the strategy for a document.
    pub fn classify(&self, source: &str, segments: &[Segment]) -> Classification {
        let signals = self.signals(source, segments);
        let strategy = self.decide(&signals);
        debug!(source, strategy = %strategy, ?signals, "Classified document");
        Classification { strategy, signals }
    }

    /// Measure the structural signals without deciding.
    pub fn signals(&self, source: &str, segments: &[Segment]) -> DocumentSignals {
        let name = source.to_lowercase();
        let contains_any = |keywords: &[String]| {
            keywords
                .iter()
                .any(|k| !k.is_empty() && name.contains(&k.to_lowercase()))
        };

        let legal_markers = segments
            .iter()
            .filter(|s| s.kind.is_prose())
            .map(|s| plan::LEGAL_MARKER.find_iter(&s.content).count())
            .sum();

        let tables = segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Table)
            .count();
        let table_ratio = if segments.is_empty() {
            0.0
        } else {
            tables as f64 / segments.len() as f64
        };

        let max_heading_depth = segments
            .iter()
            .map(|s| s.heading_path.depth())
            .max()
            .unwrap_or(0);

        DocumentSignals {
            legal_markers,
            legal_source_hint: contains_any(self.legal_source_keywords.as_slice()),
            tabular_source_hint: contains_any(self.tabular_source_keywords.as_slice()),
            table_ratio,
            max_heading_depth,
            heading_consistency: heading_consistency(segments),
        }
    }

    fn decide(&self, signals: &DocumentSignals) -> ChunkingStrategy {
        if signals.legal_source_hint || signals.legal_markers >= self.legal_marker_min_count.max(1) {
            return ChunkingStrategy::Legal;
        }
        if signals.tabular_source_hint || signals.table_ratio > self.tabular_ratio_threshold {
            return ChunkingStrategy::Tabular;
        }
        if signals.max_heading_depth >= 2
            && signals.heading_consistency >= self.heading_consistency_threshold
        {
            return ChunkingStrategy::Hierarchical;
        }
        ChunkingStrategy::Fallback
    }
}

impl Default for StrategyClassifier {
    fn default() -> Self {
        Self::new(&ChunkingConfig::default())
    }
}

/// Share of heading-path changes that descend by at most one level past the
/// prefix shared with the previous path.
///
/// Jumping from `1장` straight to `1장 > 가 > (1)` is an irregular transition;
/// moving back up any number of levels is always regular.
fn heading_consistency(segments: &[Segment]) -> f64 {
    let mut previous = HeadingPath::root();
    let mut changes = 0usize;
    let mut regular = 0usize;

    for path in segments.iter().map(|s| &s.heading_path) {
        if *path == previous {
            continue;
        }
        changes += 1;
        if path.depth() <= path.common_prefix_len(&previous) + 1 {
            regular += 1;
        }
        previous = path.clone();
    }

    if changes == 0 {
        1.0
    } else {
        regular as f64 / changes as f64
    }
}
