//! Rolling-window grouping of sentences into token-bounded chunks.

use std::sync::Arc;

use tracing::debug;

use super::base::TokenCounter;
use super::sentence_splitter::Sentence;
use crate::types::{ChunkCandidate, ChunkFlags, ChunkKind, ChunkingConfig};

/// A closed window over a unit's sentence slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: usize,
    end: usize,
    /// Leading sentences carried over from the previous window
    overlap: usize,
    oversized: bool,
}

/// Groups the sentences of one structural unit into overlapping windows.
///
/// Windows grow while the token count of the joined window text, separators
/// included, stays within `max_tokens`. Each new window is seeded with the
/// longest run of trailing sentences from the previous one that fits in
/// `overlap_tokens`. Sentences are never split; one that alone exceeds the
/// ceiling becomes its own oversized chunk.
#[derive(Clone)]
pub struct RollingWindowGrouper {
    counter: Arc<dyn TokenCounter>,
    min_tokens: usize,
    max_tokens: usize,
    overlap_tokens: usize,
}

impl RollingWindowGrouper {
    /// Create a grouper from a validated configuration.
    pub fn new(config: &ChunkingConfig, counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            counter,
            min_tokens: config.min_tokens,
            max_tokens: config.max_tokens,
            overlap_tokens: config.overlap_tokens,
        }
    }

    /// Group one unit's sentences into chunk candidates, in order.
    ///
    /// Each candidate inherits the heading path of its first sentence and
    /// reports the token count of its joined content.
    pub fn group(&self, sentences: &[Sentence]) -> Vec<ChunkCandidate> {
        self.windows(sentences)
            .into_iter()
            .map(|w| self.to_candidate(sentences, w))
            .collect()
    }

    /// Tokens in the joined text of `sentences[start..end]`.
    fn measure(&self, sentences: &[Sentence], start: usize, end: usize) -> usize {
        if start >= end {
            return 0;
        }
        self.counter.count_tokens(&join(&sentences[start..end]))
    }

    fn windows(&self, sentences: &[Sentence]) -> Vec<Window> {
        let mut windows: Vec<Window> = Vec::new();
        let mut start = 0;
        let mut seed = 0;

        for (i, sentence) in sentences.iter().enumerate() {
            if sentence.token_count > self.max_tokens {
                self.close(&mut windows, sentences, start, i, seed);
                debug!(
                    token_count = sentence.token_count,
                    max_tokens = self.max_tokens,
                    "Sentence exceeds token ceiling, emitting whole"
                );
                windows.push(Window {
                    start: i,
                    end: i + 1,
                    overlap: 0,
                    oversized: true,
                });
                start = i + 1;
                seed = 0;
                continue;
            }

            if i > start && self.measure(sentences, start, i + 1) > self.max_tokens {
                self.close(&mut windows, sentences, start, i, seed);
                let seed_start = self.overlap_seed(sentences, windows.last(), i);
                start = seed_start;
                seed = i - seed_start;
            }
        }
        self.close(&mut windows, sentences, start, sentences.len(), seed);

        windows
    }

    /// Close `[start, end)` as a window unless it holds nothing but overlap.
    ///
    /// A window under `min_tokens` is folded into the previous one when the
    /// joined text still fits the ceiling. The previous window closed because
    /// its next sentence overflowed, so the fold only fits for counters whose
    /// count can drop as text is appended; otherwise the short window stays.
    fn close(&self, windows: &mut Vec<Window>, sentences: &[Sentence], start: usize, end: usize, seed: usize) {
        if end <= start + seed {
            return;
        }

        if self.measure(sentences, start, end) < self.min_tokens {
            if let Some(prev) = windows.last_mut() {
                if !prev.oversized
                    && prev.end == start + seed
                    && self.measure(sentences, prev.start, end) <= self.max_tokens
                {
                    prev.end = end;
                    return;
                }
            }
        }

        windows.push(Window {
            start,
            end,
            overlap: seed,
            oversized: false,
        });
    }

    /// First index of the trailing sentences of `prev` to repeat before
    /// sentence `next`.
    ///
    /// The seed is trimmed from the front until the next sentence fits beside
    /// it.
    fn overlap_seed(&self, sentences: &[Sentence], prev: Option<&Window>, next: usize) -> usize {
        let Some(prev) = prev.filter(|w| !w.oversized && w.end == next) else {
            return next;
        };

        let mut seed_start = prev.end;
        while seed_start > prev.start && self.measure(sentences, seed_start - 1, prev.end) <= self.overlap_tokens {
            seed_start -= 1;
        }
        while seed_start < next && self.measure(sentences, seed_start, next + 1) > self.max_tokens {
            seed_start += 1;
        }

        seed_start
    }

    fn to_candidate(&self, sentences: &[Sentence], window: Window) -> ChunkCandidate {
        let slice = &sentences[window.start..window.end];
        let first = &slice[0];
        let content = join(slice);

        ChunkCandidate {
            kind: ChunkKind::Text,
            token_count: self.counter.count_tokens(&content),
            content,
            heading_path: first.heading_path.clone(),
            page: first.page,
            flags: ChunkFlags {
                oversized: window.oversized,
                segmentation_degraded: slice.iter().any(|s| s.degraded),
            },
            overlap_sentences: window.overlap,
            sentence_count: slice.len(),
            source_order: first.source_segment_order,
        }
    }
}

/// Sentences of one segment join with a space, segments with a blank line.
fn join(sentences: &[Sentence]) -> String {
    let mut content = String::new();
    for (i, sentence) in sentences.iter().enumerate() {
        if i > 0 {
            let same_segment = sentences[i - 1].source_segment_order == sentence.source_segment_order;
            content.push_str(if same_segment { " " } else { "\n\n" });
        }
        content.push_str(&sentence.text);
    }
    content
}
