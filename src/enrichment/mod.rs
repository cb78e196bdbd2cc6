//! Context enrichment for retrieval-ready chunks.
//!
//! This module provides:
//! - Breadcrumb generation from heading paths
//! - Document-level numbering (`index` / `total_chunks`)
//! - Provenance and caller metadata on every chunk

pub mod context_builder;

pub use context_builder::ContextEnricher;
