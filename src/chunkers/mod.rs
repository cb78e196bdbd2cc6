//! Building blocks that turn segments into chunk candidates.

mod base;
mod sentence_splitter;
mod table_chunker;
mod window_chunker;

pub use base::{
    counter_for_encoding, split_sentences, TiktokenCounter, TokenCounter, WhitespaceCounter,
    SENTENCE_DELIMITERS,
};
pub use sentence_splitter::{
    KoreanSentenceSplitter, PunctuationSplitter, Sentence, SentenceSegmenter, SentenceSplitter,
};
pub use table_chunker::TableIsolator;
pub use window_chunker::RollingWindowGrouper;
