//! Context enricher that finalizes chunk candidates.
//!
//! Candidates arrive fully ordered and are numbered in a second pass once the
//! total is known, so `index` values are dense and every chunk shares the same
//! `total_chunks`.

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::{Chunk, ChunkCandidate, ChunkingConfig, ChunkingStrategy, HeadingPath};

/// Builds breadcrumbs and stamps provenance onto chunk candidates.
#[derive(Debug, Clone)]
pub struct ContextEnricher {
    /// Separator between headings in a breadcrumb.
    separator: String,
    /// Breadcrumb depth for strategies that do not emphasise full paths.
    shallow_depth: usize,
}

impl Default for ContextEnricher {
    fn default() -> Self {
        Self::new(&ChunkingConfig::default())
    }
}

impl ContextEnricher {
    /// Create an enricher with the breadcrumb settings from `config`.
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            separator: config.breadcrumb_separator.clone(),
            shallow_depth: config.shallow_breadcrumb_depth,
        }
    }

    /// Set the separator between headings.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set the breadcrumb depth used by the tabular and fallback strategies.
    pub fn with_shallow_depth(mut self, depth: usize) -> Self {
        self.shallow_depth = depth;
        self
    }

    /// Build the breadcrumb for a heading path under `strategy`.
    pub fn breadcrumb(&self, path: &HeadingPath, strategy: ChunkingStrategy) -> String {
        if strategy.full_breadcrumb() {
            path.join(&self.separator)
        } else {
            path.truncated(self.shallow_depth).join(&self.separator)
        }
    }

    /// Finalize candidates into chunks, preserving their order.
    ///
    /// `content` is copied through untouched; the breadcrumb lives in its own
    /// field and in [`Chunk::embedding_text`].
    pub fn enrich(
        &self,
        candidates: Vec<ChunkCandidate>,
        source: &str,
        strategy: ChunkingStrategy,
        metadata: &Map<String, Value>,
    ) -> Vec<Chunk> {
        let total_chunks = candidates.len();
        let created_at = Utc::now();

        candidates
            .into_iter()
            .enumerate()
            .map(|(index, candidate)| Chunk {
                id: Uuid::new_v4(),
                source: source.to_string(),
                index,
                total_chunks,
                char_count: candidate.content.chars().count(),
                breadcrumb: self.breadcrumb(&candidate.heading_path, strategy),
                content: candidate.content,
                token_count: candidate.token_count,
                heading_path: candidate.heading_path,
                page: candidate.page,
                strategy,
                kind: candidate.kind,
                flags: candidate.flags,
                overlap_sentences: candidate.overlap_sentences,
                metadata: metadata.clone(),
                created_at,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::types::{ChunkFlags, ChunkKind};

    fn candidate(content: &str, path: HeadingPath) -> ChunkCandidate {
        ChunkCandidate {
            kind: ChunkKind::Text,
            content: content.to_string(),
            token_count: content.split_whitespace().count(),
            heading_path: path,
            page: Some(3),
            flags: ChunkFlags::default(),
            overlap_sentences: 0,
            sentence_count: 1,
            source_order: 0,
        }
    }

    fn deep_path() -> HeadingPath {
        HeadingPath::new(["1장", "개요", "배경"])
    }

    #[test]
    fn test_breadcrumb_depth_by_strategy() {
        let enricher = ContextEnricher::default();
        let path = deep_path();

        assert_eq!(enricher.breadcrumb(&path, ChunkingStrategy::Hierarchical), "1장 > 개요 > 배경");
        assert_eq!(enricher.breadcrumb(&path, ChunkingStrategy::Legal), "1장 > 개요 > 배경");
        assert_eq!(enricher.breadcrumb(&path, ChunkingStrategy::Tabular), "1장 > 개요");
        assert_eq!(enricher.breadcrumb(&path, ChunkingStrategy::Fallback), "1장 > 개요");
        assert_eq!(enricher.breadcrumb(&HeadingPath::root(), ChunkingStrategy::Legal), "");
    }

    #[test]
    fn test_custom_separator() {
        let enricher = ContextEnricher::default()
            .with_separator(" / ")
            .with_shallow_depth(1);
        assert_eq!(enricher.breadcrumb(&deep_path(), ChunkingStrategy::Hierarchical), "1장 / 개요 / 배경");
        assert_eq!(enricher.breadcrumb(&deep_path(), ChunkingStrategy::Fallback), "1장");
    }

    #[test]
    fn test_enrich_numbers_densely() {
        let candidates = vec![
            candidate("첫 번째 청크", deep_path()),
            candidate("두 번째", deep_path()),
            candidate("세 번째 청크입니다", HeadingPath::root()),
        ];
        let mut metadata = Map::new();
        metadata.insert("last_modified".to_string(), json!("2024-03-01"));

        let chunks = ContextEnricher::default().enrich(
            candidates,
            "report.pdf",
            ChunkingStrategy::Hierarchical,
            &metadata,
        );

        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.total_chunks, 3);
            assert_eq!(chunk.source, "report.pdf");
            assert_eq!(chunk.metadata.get("last_modified"), Some(&json!("2024-03-01")));
        }
        assert_eq!(chunks[0].content, "첫 번째 청크");
        assert_eq!(chunks[0].char_count, 7);
        assert_eq!(chunks[0].breadcrumb, "1장 > 개요 > 배경");
        assert_eq!(chunks[2].breadcrumb, "");
        assert_ne!(chunks[0].id, chunks[1].id);
    }

    #[test]
    fn test_embedding_text_prepends_breadcrumb() {
        let chunks = ContextEnricher::default().enrich(
            vec![candidate("본문", deep_path()), candidate("머리 없음", HeadingPath::root())],
            "doc",
            ChunkingStrategy::Legal,
            &Map::new(),
        );
        assert_eq!(chunks[0].embedding_text(), "[1장 > 개요 > 배경]\n본문");
        assert_eq!(chunks[0].content, "본문");
        assert_eq!(chunks[1].embedding_text(), "머리 없음");
    }

    #[test]
    fn test_enrich_empty() {
        let chunks = ContextEnricher::default().enrich(
            Vec::new(),
            "doc",
            ChunkingStrategy::Fallback,
            &Map::new(),
        );
        assert!(chunks.is_empty());
    }
}
