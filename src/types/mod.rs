//! Core types for the chunking engine.

mod chunk;
mod config;
mod segment;
mod strategy;

pub use chunk::{Chunk, ChunkCandidate, ChunkFlags, ChunkKind};
pub use config::{ChunkingConfig, ServiceConfig, TableFormat};
pub use segment::{Document, HeadingPath, Segment, SegmentKind};
pub use strategy::ChunkingStrategy;
