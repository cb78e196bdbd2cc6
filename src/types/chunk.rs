//! Chunk type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ChunkingStrategy, HeadingPath};

/// What a chunk was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Grouped sentences from text and image-description segments
    Text,
    /// A single isolated table
    Table,
}

/// Quality flags carried by a chunk for downstream monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFlags {
    /// A single sentence or table that could not fit under `max_tokens`
    pub oversized: bool,
    /// Sentence boundaries came from the punctuation fallback splitter
    pub segmentation_degraded: bool,
}

/// A chunk produced by grouping or table isolation, before enrichment.
///
/// Candidates carry everything the enricher needs except document-level
/// numbering and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkCandidate {
    pub kind: ChunkKind,
    pub content: String,
    pub token_count: usize,
    pub heading_path: HeadingPath,
    pub page: Option<u32>,
    pub flags: ChunkFlags,
    /// Leading sentences repeated from the previous candidate of the same unit
    pub overlap_sentences: usize,
    /// Total sentences in the candidate (1 for tables)
    pub sentence_count: usize,
    /// `order` of the segment the candidate starts in
    pub source_order: u64,
}

/// A retrieval-ready chunk.
///
/// Chunks are the fundamental unit handed to the indexing layer. Each chunk
/// keeps its breadcrumb and provenance so it can be understood in isolation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier for this chunk
    pub id: Uuid,

    /// Document identifier the chunk was cut from
    pub source: String,

    /// Position of this chunk in the document run (0-indexed, dense)
    pub index: usize,

    /// Number of chunks produced for the document
    pub total_chunks: usize,

    /// The actual text content of the chunk
    pub content: String,

    /// Number of tokens in this chunk
    pub token_count: usize,

    /// Number of characters (Unicode scalar values) in the content
    pub char_count: usize,

    /// Joined heading path, e.g. `"1장 > 개요 > 배경"`
    pub breadcrumb: String,

    /// Heading path the breadcrumb was built from
    pub heading_path: HeadingPath,

    /// Page number of the originating segment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Strategy that produced this chunk
    pub strategy: ChunkingStrategy,

    /// Text or table
    pub kind: ChunkKind,

    /// Oversize / degraded-segmentation markers
    pub flags: ChunkFlags,

    /// Leading sentences shared with the previous chunk
    pub overlap_sentences: usize,

    /// Caller-supplied metadata, merged verbatim
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// When this chunk was created
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Content with the breadcrumb prepended, for embedding and display.
    ///
    /// `content` itself is never modified.
    pub fn embedding_text(&self) -> String {
        if self.breadcrumb.is_empty() {
            self.content.clone()
        } else {
            format!("[{}]\n{}", self.breadcrumb, self.content)
        }
    }

    /// Whether the chunk is an isolated table.
    pub fn is_table(&self) -> bool {
        self.kind == ChunkKind::Table
    }

    /// Get the length of the chunk content in characters.
    pub fn len(&self) -> usize {
        self.char_count
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
