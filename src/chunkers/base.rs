//! Token counting and shared splitting helpers.

use std::sync::Arc;

use tracing::warn;

use crate::error::ConfigError;

/// Token counter trait for counting tokens in text.
///
/// Implementations must be pure: the same text always yields the same count.
pub trait TokenCounter: Send + Sync {
    /// Count the number of tokens in the given text.
    fn count_tokens(&self, text: &str) -> usize;

    /// Name of the encoding or scheme, for logging.
    fn name(&self) -> &str;
}

/// Token counter backed by a tiktoken BPE encoding.
pub struct TiktokenCounter {
    bpe: tiktoken_rs::CoreBPE,
    encoding: String,
}

impl TiktokenCounter {
    /// Create a counter with the cl100k_base encoding (GPT-4, text-embedding-3).
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_encoding("cl100k_base")
    }

    /// Create a token counter with a specific encoding.
    pub fn with_encoding(encoding_name: &str) -> Result<Self, ConfigError> {
        let bpe = match encoding_name {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "p50k_edit" => tiktoken_rs::p50k_edit(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            other => Err(anyhow::anyhow!("unknown encoding '{other}'")),
        }
        .map_err(|source| ConfigError::Tokenizer {
            encoding: encoding_name.to_string(),
            source: source.into(),
        })?;

        Ok(Self {
            bpe,
            encoding: encoding_name.to_string(),
        })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn name(&self) -> &str {
        &self.encoding
    }
}

/// Counts whitespace-separated words.
///
/// Used when no BPE encoding can be loaded, and in tests where exact token
/// arithmetic matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Build the counter for `encoding`, falling back to word counting if it cannot load.
pub fn counter_for_encoding(encoding: &str) -> Arc<dyn TokenCounter> {
    match TiktokenCounter::with_encoding(encoding) {
        Ok(counter) => Arc::new(counter),
        Err(e) => {
            warn!(encoding, error = %e, "Falling back to whitespace token counter");
            Arc::new(WhitespaceCounter)
        }
    }
}

/// Terminal punctuation recognised by the punctuation splitter.
pub const SENTENCE_DELIMITERS: &[char] = &['.', '!', '?', '。', '？', '！'];

/// Split text at sentence punctuation followed by whitespace or end of input.
///
/// Deterministic, allocation-light and dependency-free; every non-whitespace
/// character of the input lands in exactly one returned sentence.
pub fn split_sentences(text: &str, delimiters: &[char]) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if delimiters.contains(&c) && chars.peek().map_or(true, |next| next.is_whitespace()) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// Strip all whitespace; used to compare texts modulo whitespace normalisation.
pub(crate) fn without_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
