//! Korean-aware sentence segmentation.
//!
//! The segmenter runs a pluggable primary [`SentenceSplitter`] and checks that
//! its output reproduces the input. When the primary fails, it degrades to
//! [`PunctuationSplitter`] and marks every produced sentence as degraded
//! instead of failing the document.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use super::base::{split_sentences, without_whitespace, TokenCounter, SENTENCE_DELIMITERS};
use crate::error::SegmentationError;
use crate::types::HeadingPath;

lazy_static! {
    /// A fragment that is only an enumeration marker: `1.`, `가.`, `(3)`, `iv)`, `①`.
    ///
    /// Hangul markers are limited to the 가나다 sequence so that a one-syllable
    /// sentence such as `끝.` stays a sentence.
    static ref LIST_MARKER: Regex = Regex::new(
        r"^(?:\d{1,3}[.)]|[가나다라마바사아자차카타파하a-zA-Z][.)]|[ivxIVX]{1,4}[.)]|\(\d{1,3}\)|\([가나다라마바사아자차카타파하a-zA-Z]\)|[\x{2460}-\x{2473}])$"
    )
    .unwrap();
}

/// Symbols that open a bullet line in Korean reports.
const BULLETS: &[char] = &[
    '□', '■', '○', '●', '◦', '•', '▶', '▷', '※', '◆', '◇', 'ㅇ', '·', '-', '*', '>',
];

/// Syllables that end a Korean sentence even without punctuation.
///
/// Covers declaratives (`다`, `요`), questions (`까`, `죠`) and the nominal
/// endings used in reports (`음`, `함`, `됨`, `임`).
const TERMINAL_ENDINGS: &[char] = &['다', '요', '까', '죠', '음', '함', '됨', '임'];

/// Closing quotes and brackets that may trail terminal punctuation.
const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']', '」', '』', '】', '》'];

/// A splitter that turns a block of text into sentence strings.
pub trait SentenceSplitter: Send + Sync {
    /// Get the name of this splitter.
    fn name(&self) -> &'static str;

    /// Split `text` into trimmed sentences, in order, without dropping content.
    fn split(&self, text: &str) -> Result<Vec<String>, SegmentationError>;
}

/// UAX #29 sentence bounds refined with Korean line and enumeration rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct KoreanSentenceSplitter;

impl KoreanSentenceSplitter {
    pub fn new() -> Self {
        Self
    }

    fn is_sentence_final(trimmed: &str) -> bool {
        let core = trimmed.trim_end_matches(CLOSERS);
        core.chars()
            .last()
            .map_or(false, |c| SENTENCE_DELIMITERS.contains(&c) || TERMINAL_ENDINGS.contains(&c))
    }

    fn opens_new_item(piece: &str) -> bool {
        let head = piece.trim_start();
        if head.starts_with(BULLETS) {
            return true;
        }
        head.split_whitespace()
            .next()
            .map_or(false, |first| LIST_MARKER.is_match(first))
    }
}

impl SentenceSplitter for KoreanSentenceSplitter {
    fn name(&self) -> &'static str {
        "korean_uax29"
    }

    fn split(&self, text: &str) -> Result<Vec<String>, SegmentationError> {
        let mut sentences = Vec::new();
        let mut pending = String::new();

        for piece in text.split_sentence_bounds() {
            if piece.trim().is_empty() {
                // Blank lines are paragraph breaks.
                if piece.contains('\n') {
                    flush_pending(&mut pending, &mut sentences);
                } else {
                    pending.push_str(piece);
                }
                continue;
            }

            if !pending.trim().is_empty() && Self::opens_new_item(piece) {
                flush_pending(&mut pending, &mut sentences);
            }

            pending.push_str(piece);
            let trimmed = pending.trim();

            if LIST_MARKER.is_match(trimmed) {
                continue;
            }
            // A line break without a sentence ending is a hard wrap, not a boundary.
            if piece.ends_with('\n') && !Self::is_sentence_final(trimmed) {
                continue;
            }
            flush_pending(&mut pending, &mut sentences);
        }
        flush_pending(&mut pending, &mut sentences);

        Ok(sentences)
    }
}

fn flush_pending(pending: &mut String, sentences: &mut Vec<String>) {
    let trimmed = pending.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    pending.clear();
}

/// Deterministic splitter on terminal punctuation followed by whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSplitter;

impl SentenceSplitter for PunctuationSplitter {
    fn name(&self) -> &'static str {
        "punctuation"
    }

    fn split(&self, text: &str) -> Result<Vec<String>, SegmentationError> {
        Ok(split_sentences(text, SENTENCE_DELIMITERS))
    }
}

/// A sentence with its token count and provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub token_count: usize,
    pub source_segment_order: u64,
    pub page: Option<u32>,
    /// Heading path of the originating segment
    pub heading_path: HeadingPath,
    /// Produced by the punctuation fallback rather than the primary splitter
    pub degraded: bool,
}

/// Splits text pieces into token-counted sentences.
///
/// Holds no mutable state; every call is independent.
#[derive(Clone)]
pub struct SentenceSegmenter {
    primary: Arc<dyn SentenceSplitter>,
    fallback: PunctuationSplitter,
    counter: Arc<dyn TokenCounter>,
}

impl SentenceSegmenter {
    /// Create a segmenter with the Korean splitter as primary.
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self::with_splitter(Arc::new(KoreanSentenceSplitter::new()), counter)
    }

    /// Create a segmenter with a custom primary splitter.
    pub fn with_splitter(primary: Arc<dyn SentenceSplitter>, counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            primary,
            fallback: PunctuationSplitter,
            counter,
        }
    }

    /// Split one segment's text into sentences.
    ///
    /// Text without a detectable boundary comes back as a single sentence;
    /// blank text yields nothing.
    pub fn segment(
        &self,
        text: &str,
        source_segment_order: u64,
        page: Option<u32>,
        heading_path: &HeadingPath,
    ) -> Vec<Sentence> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let (pieces, degraded) = match self.primary_split(text) {
            Ok(pieces) => (pieces, false),
            Err(e) => {
                warn!(
                    splitter = self.primary.name(),
                    segment = source_segment_order,
                    error = %e,
                    "Sentence segmentation degraded to punctuation splitting"
                );
                // The punctuation splitter is total and infallible.
                let pieces = self.fallback.split(text).unwrap_or_default();
                (pieces, true)
            }
        };

        pieces
            .into_iter()
            .map(|text| Sentence {
                token_count: self.counter.count_tokens(&text),
                text,
                source_segment_order,
                page,
                heading_path: heading_path.clone(),
                degraded,
            })
            .collect()
    }

    fn primary_split(&self, text: &str) -> Result<Vec<String>, SegmentationError> {
        let pieces = self.primary.split(text)?;
        if pieces.is_empty() || without_whitespace(&pieces.concat()) != without_whitespace(text) {
            return Err(SegmentationError::ContentMismatch);
        }
        Ok(pieces)
    }
}
