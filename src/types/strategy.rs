//! Chunking strategy tags.

use serde::{Deserialize, Serialize};

/// The closed set of chunking strategies a document can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Court rulings and statutes split at bracketed section markers
    Legal,
    /// Table-heavy statistical reports
    Tabular,
    /// Reports with a regular multi-level heading structure
    Hierarchical,
    /// Plain overlap grouping with no structural awareness
    Fallback,
}

impl ChunkingStrategy {
    /// All strategies in classification precedence order.
    pub const ALL: [ChunkingStrategy; 4] = [
        ChunkingStrategy::Legal,
        ChunkingStrategy::Tabular,
        ChunkingStrategy::Hierarchical,
        ChunkingStrategy::Fallback,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChunkingStrategy::Legal => "legal",
            ChunkingStrategy::Tabular => "tabular",
            ChunkingStrategy::Hierarchical => "hierarchical",
            ChunkingStrategy::Fallback => "fallback",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ChunkingStrategy::Legal => {
                "Splits at bracketed section markers before falling back to token windows"
            }
            ChunkingStrategy::Tabular => {
                "Isolates every table and windows each text segment on its own"
            }
            ChunkingStrategy::Hierarchical => {
                "Windows each heading section separately with full breadcrumbs"
            }
            ChunkingStrategy::Fallback => "Plain overlap windows across all body text",
        }
    }

    /// Whether chunks carry the full heading path rather than a shallow prefix.
    pub fn full_breadcrumb(&self) -> bool {
        matches!(self, ChunkingStrategy::Legal | ChunkingStrategy::Hierarchical)
    }
}

impl std::fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
