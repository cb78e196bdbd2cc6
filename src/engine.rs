//! The adaptive chunking engine.
//!
//! Ties the pipeline together: classify the document, plan structural units,
//! segment prose into sentences, group sentences into windows, isolate tables
//! and enrich the result.

use std::sync::Arc;

use tracing::{debug, info};

use crate::chunkers::{
    counter_for_encoding, RollingWindowGrouper, SentenceSegmenter, SentenceSplitter, TableIsolator,
    TokenCounter,
};
use crate::enrichment::ContextEnricher;
use crate::error::{ChunkingError, ConfigError};
use crate::router::{Block, Classification, StrategyClassifier, UnitPlanner};
use crate::types::{Chunk, ChunkCandidate, ChunkingConfig, Document, Segment};

/// Structure-aware chunker for parsed documents.
///
/// Holds only immutable configuration and shared components, so one instance
/// can serve any number of threads.
#[derive(Clone)]
pub struct AdaptiveChunker {
    config: ChunkingConfig,
    counter: Arc<dyn TokenCounter>,
    segmenter: SentenceSegmenter,
    classifier: StrategyClassifier,
    isolator: TableIsolator,
    grouper: RollingWindowGrouper,
    enricher: ContextEnricher,
}

impl AdaptiveChunker {
    /// Create a chunker, loading the configured tokenizer encoding.
    pub fn new(config: ChunkingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let counter = counter_for_encoding(&config.encoding);
        Self::with_counter(config, counter)
    }

    /// Create a chunker with an explicit token counter.
    pub fn with_counter(
        config: ChunkingConfig,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            segmenter: SentenceSegmenter::new(counter.clone()),
            classifier: StrategyClassifier::new(&config),
            isolator: TableIsolator::new(counter.clone()),
            grouper: RollingWindowGrouper::new(&config, counter.clone()),
            enricher: ContextEnricher::new(&config),
            counter,
            config,
        })
    }

    /// Replace the primary sentence splitter.
    pub fn with_splitter(mut self, splitter: Arc<dyn SentenceSplitter>) -> Self {
        self.segmenter = SentenceSegmenter::with_splitter(splitter, self.counter.clone());
        self
    }

    /// A chunker with different settings.
    ///
    /// The token counter and sentence splitter are shared when the encoding is
    /// unchanged.
    pub fn reconfigured(&self, config: ChunkingConfig) -> Result<Self, ConfigError> {
        if config.encoding != self.config.encoding {
            return Self::new(config);
        }
        let mut chunker = Self::with_counter(config, self.counter.clone())?;
        chunker.segmenter = self.segmenter.clone();
        Ok(chunker)
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Name of the token counter in use.
    pub fn tokenizer(&self) -> &str {
        self.counter.name()
    }

    /// Classify a document without chunking it.
    pub fn classify(&self, document: &Document) -> Classification {
        self.classifier.classify(&document.source, &document.segments)
    }

    /// Chunk one document.
    ///
    /// The run is atomic: either every chunk comes back with dense indices or
    /// an error is returned and nothing is emitted.
    pub fn chunk(&self, document: &Document) -> Result<Vec<Chunk>, ChunkingError> {
        self.chunk_classified(document).map(|(_, chunks)| chunks)
    }

    /// Chunk one document and return the classification that drove it.
    ///
    /// A document without segments still gets a classification.
    pub fn chunk_classified(&self, document: &Document) -> Result<(Classification, Vec<Chunk>), ChunkingError> {
        let source = document.source.as_str();
        check_segment_order(source, &document.segments)?;

        let classification = self.classify(document);
        if document.segments.is_empty() {
            info!(source, chunks = 0, "Document has no segments");
            return Ok((classification, Vec::new()));
        }
        let strategy = classification.strategy;

        let mut candidates: Vec<ChunkCandidate> = Vec::new();
        for block in strategy.plan(&document.segments) {
            match block {
                Block::Unit(unit) => {
                    let sentences: Vec<_> = unit
                        .pieces
                        .iter()
                        .flat_map(|p| self.segmenter.segment(p.text, p.order, p.page, &p.heading_path))
                        .collect();
                    candidates.extend(self.grouper.group(&sentences));
                }
                Block::Table(segment) => {
                    candidates.extend(self.isolator.isolate(segment, &self.config));
                }
            }
        }
        self.check_candidates(source, &candidates)?;

        let chunks = self
            .enricher
            .enrich(candidates, source, strategy, &document.extra_metadata);
        check_indices(source, &chunks)?;

        let oversized = chunks.iter().filter(|c| c.flags.oversized).count();
        let degraded = chunks
            .iter()
            .filter(|c| c.flags.segmentation_degraded)
            .count();
        info!(
            source,
            strategy = %strategy,
            segments = document.segments.len(),
            chunks = chunks.len(),
            oversized,
            degraded,
            "Chunked document"
        );

        Ok((classification, chunks))
    }

    fn check_candidates(&self, source: &str, candidates: &[ChunkCandidate]) -> Result<(), ChunkingError> {
        let mut last_order = None;
        for (i, candidate) in candidates.iter().enumerate() {
            let counted = self.counter.count_tokens(&candidate.content);
            if counted != candidate.token_count {
                return Err(ChunkingError::invariant(
                    source,
                    format!(
                        "candidate {} reports {} tokens but its content has {}",
                        i, candidate.token_count, counted
                    ),
                ));
            }
            if !candidate.flags.oversized && counted > self.config.max_tokens {
                return Err(ChunkingError::invariant(
                    source,
                    format!(
                        "candidate {} has {} tokens over the {} ceiling without an oversize flag",
                        i, candidate.token_count, self.config.max_tokens
                    ),
                ));
            }
            if last_order.is_some_and(|last| candidate.source_order < last) {
                return Err(ChunkingError::invariant(
                    source,
                    format!("candidate {} is out of document order", i),
                ));
            }
            last_order = Some(candidate.source_order);
        }
        debug!(source, candidates = candidates.len(), "Candidates verified");
        Ok(())
    }
}

fn check_segment_order(source: &str, segments: &[Segment]) -> Result<(), ChunkingError> {
    match segments.windows(2).find(|w| w[1].order <= w[0].order) {
        Some(w) => Err(ChunkingError::invariant(
            source,
            format!(
                "segment order must be strictly increasing, found {} after {}",
                w[1].order, w[0].order
            ),
        )),
        None => Ok(()),
    }
}

fn check_indices(source: &str, chunks: &[Chunk]) -> Result<(), ChunkingError> {
    let total = chunks.len();
    let dense = chunks
        .iter()
        .enumerate()
        .all(|(i, c)| c.index == i && c.total_chunks == total);
    if dense {
        Ok(())
    } else {
        Err(ChunkingError::invariant(source, "chunk indices are not dense"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::chunkers::{PunctuationSplitter, TiktokenCounter, WhitespaceCounter};
    use crate::types::{ChunkKind, ChunkingStrategy, HeadingPath};

    fn path(headings: &[&str]) -> HeadingPath {
        HeadingPath::new(headings.iter().copied())
    }

    /// Engine with word-count tokens and punctuation splitting for exact arithmetic.
    fn chunker(min: usize, max: usize, overlap: usize) -> AdaptiveChunker {
        AdaptiveChunker::with_counter(
            ChunkingConfig::with_tokens(min, max, overlap),
            Arc::new(WhitespaceCounter),
        )
        .unwrap()
        .with_splitter(Arc::new(PunctuationSplitter))
    }

    /// A sentence of exactly `tokens` words ending in `끝{tag}.`.
    fn sentence(tag: usize, tokens: usize) -> String {
        let mut words = vec!["낱말"; tokens - 1].join(" ");
        if !words.is_empty() {
            words.push(' ');
        }
        format!("{}끝{}.", words, tag)
    }

    fn paragraph(sizes: &[usize]) -> String {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &t)| sentence(i, t))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn assert_dense(chunks: &[Chunk]) {
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.total_chunks, chunks.len());
        }
    }

    #[test]
    fn test_hierarchical_report() {
        let document = Document::new(
            "report.pdf",
            vec![
                Segment::text(0, "이 장은 개요를 다룬다.", path(&["1장"])),
                Segment::text(1, paragraph(&[80; 12]), path(&["1장", "개요"])),
            ],
        );
        let chunks = chunker(100, 500, 50).chunk(&document).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_dense(&chunks);
        assert!(chunks.iter().all(|c| c.strategy == ChunkingStrategy::Hierarchical));
        assert_eq!(chunks[0].breadcrumb, "1장");
        for chunk in &chunks[1..] {
            assert_eq!(chunk.token_count, 480);
            assert_eq!(chunk.breadcrumb, "1장 > 개요");
            assert_eq!(chunk.overlap_sentences, 0);
            assert_eq!(chunk.content.matches('끝').count(), 6);
        }
        assert!(chunks[1].content.starts_with("낱말"));
        assert!(chunks[2].content.ends_with("끝11."));
    }

    #[test]
    fn test_legal_ruling() {
        let document = Document::new(
            "[민사] 2023다1234.pdf",
            vec![
                Segment::text(0, "대법원 판결.", path(&["판결"])),
                Segment::text(1, "【주문】 상고를 기각한다. 【이유】 상고이유를 판단한다.", path(&["판결"])),
                Segment::text(2, "원심의 판단은 정당하다.", path(&["판결"])),
            ],
        );
        let chunks = chunker(0, 100, 10).chunk(&document).unwrap();

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.strategy == ChunkingStrategy::Legal));
        assert_eq!(chunks[1].content, "【주문】 상고를 기각한다.");
        assert_eq!(chunks[1].breadcrumb, "판결 > 주문");
        assert_eq!(
            chunks[2].content,
            "【이유】 상고이유를 판단한다.\n\n원심의 판단은 정당하다."
        );
        assert_eq!(chunks[2].breadcrumb, "판결 > 이유");
    }

    #[test]
    fn test_tabular_document_isolates_every_table() {
        let document = Document::new(
            "2024 재정동향.pdf",
            vec![
                Segment::text(0, "총수입은 증가하였다.", path(&["1. 총괄", "가. 수입", "(1) 국세"])),
                Segment::table(1, "|구분|금액|\n|---|---|\n|국세|300|", path(&["1. 총괄"])).on_page(2),
                Segment::table(2, "   ", path(&["1. 총괄"])),
                Segment::table(3, "항목\t값\n세출\t250", path(&["2. 지출"])),
            ],
        )
        .with_metadata("last_modified", json!("2024-03-31"));
        let chunks = chunker(10, 100, 10).chunk(&document).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_dense(&chunks);
        assert_eq!(chunks[0].kind, ChunkKind::Text);
        assert_eq!(chunks[0].breadcrumb, "1. 총괄 > 가. 수입");
        assert_eq!(chunks[1].kind, ChunkKind::Table);
        assert_eq!(chunks[1].content, "| 구분 | 금액 |\n| --- | --- |\n| 국세 | 300 |");
        assert_eq!(chunks[1].page, Some(2));
        assert_eq!(chunks[2].content, "| 항목 | 값 |\n| --- | --- |\n| 세출 | 250 |");
        assert!(chunks
            .iter()
            .all(|c| c.metadata.get("last_modified") == Some(&json!("2024-03-31"))));
    }

    #[test]
    fn test_token_ceiling_and_reconstruction() {
        let sizes = [12, 7, 33, 51, 2, 18, 44, 9, 27, 61, 3, 15, 38, 22, 47, 6];
        let document = Document::new("memo.txt", vec![Segment::text(0, paragraph(&sizes), HeadingPath::root())]);
        let chunks = chunker(20, 80, 25).chunk(&document).unwrap();

        assert_dense(&chunks);
        let mut tags = Vec::new();
        for chunk in &chunks {
            assert!(chunk.token_count <= 80 || chunk.flags.oversized);
            let sentences: Vec<&str> = chunk.content.split_inclusive('.').map(str::trim).collect();
            tags.extend(sentences.into_iter().skip(chunk.overlap_sentences).map(String::from));
        }
        let expected: Vec<String> = (0..sizes.len()).map(|i| sentence(i, sizes[i])).collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn test_zero_overlap_never_duplicates() {
        let document = Document::new("memo.txt", vec![Segment::text(0, paragraph(&[30; 10]), HeadingPath::root())]);
        let chunks = chunker(0, 100, 0).chunk(&document).unwrap();
        let total: usize = chunks.iter().map(|c| c.content.matches('끝').count()).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_oversized_sentence_is_flagged() {
        let document = Document::new("memo.txt", vec![Segment::text(0, paragraph(&[10, 150, 10]), HeadingPath::root())]);
        let chunks = chunker(0, 100, 0).chunk(&document).unwrap();

        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].flags.oversized);
        assert_eq!(chunks[1].token_count, 150);
        assert!(!chunks[0].flags.oversized && !chunks[2].flags.oversized);
    }

    #[test]
    fn test_empty_document() {
        let chunks = chunker(10, 100, 10).chunk(&Document::new("empty", Vec::new())).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_empty_document_is_still_classified() {
        let (classification, chunks) = chunker(10, 100, 10)
            .chunk_classified(&Document::new("[민사] 2023다1234.pdf", Vec::new()))
            .unwrap();
        assert!(chunks.is_empty());
        assert_eq!(classification.strategy, ChunkingStrategy::Legal);
    }

    #[test]
    fn test_segment_breaks_count_with_bpe_tokenizer() {
        let counter: Arc<dyn TokenCounter> = Arc::new(TiktokenCounter::new().unwrap());
        let segments = (0..12)
            .map(|i| Segment::text(i, "Revenue grew", HeadingPath::root()))
            .collect();
        let document = Document::new("memo.txt", segments);

        for max in 5..=60 {
            let config = ChunkingConfig::with_tokens(0, max, max / 4);
            let engine = AdaptiveChunker::with_counter(config, counter.clone()).unwrap();
            let chunks = engine.chunk(&document).unwrap();

            assert_dense(&chunks);
            for chunk in &chunks {
                let counted = counter.count_tokens(&chunk.content);
                assert_eq!(chunk.token_count, counted, "max_tokens {}", max);
                assert!(counted <= max, "max_tokens {}: {:?}", max, chunk.content);
                assert!(!chunk.flags.oversized);
            }
            let fresh: usize = chunks
                .iter()
                .map(|c| c.content.split("\n\n").count() - c.overlap_sentences)
                .sum();
            assert_eq!(fresh, 12);
        }
    }

    #[test]
    fn test_unordered_segments_fail_atomically() {
        let document = Document::new(
            "broken",
            vec![
                Segment::text(3, "첫 문장.", HeadingPath::root()),
                Segment::text(3, "둘째 문장.", HeadingPath::root()),
            ],
        );
        let err = chunker(10, 100, 10).chunk(&document).unwrap_err();
        assert!(matches!(err, ChunkingError::Invariant { .. }));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = AdaptiveChunker::with_counter(
            ChunkingConfig::with_tokens(10, 100, 100),
            Arc::new(WhitespaceCounter),
        );
        assert!(matches!(result, Err(ConfigError::OverlapTooLarge { .. })));
    }

    #[test]
    fn test_repeated_runs_are_stable() {
        let document = Document::new(
            "report.pdf",
            vec![
                Segment::text(0, paragraph(&[20; 8]), path(&["1장"])),
                Segment::text(1, paragraph(&[15; 6]), path(&["1장", "배경"])),
            ],
        );
        let engine = chunker(10, 60, 20);
        let first: Vec<_> = engine.chunk(&document).unwrap().into_iter().map(|c| c.content).collect();
        let second: Vec<_> = engine.chunk(&document).unwrap().into_iter().map(|c| c.content).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_korean_splitter_end_to_end() {
        let engine = AdaptiveChunker::with_counter(ChunkingConfig::default(), Arc::new(WhitespaceCounter)).unwrap();
        let document = Document::new(
            "notice.hwp",
            vec![Segment::text(0, "□ 추진 배경\n○ 재정 건전성 제고 필요함\n○ 지출 구조조정 추진", HeadingPath::root())],
        );
        let chunks = engine.chunk(&document).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "□ 추진 배경 ○ 재정 건전성 제고 필요함 ○ 지출 구조조정 추진");
        assert!(!chunks[0].flags.segmentation_degraded);
    }
}
