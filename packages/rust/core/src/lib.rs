//! Core pipeline orchestration and domain logic for manpager.
//!
//! This crate ties together discovery, rendering, section parsing, document
//! building, chunking and asset writing into the `ingest` workflow.

pub mod chunker;
pub mod document;
pub mod pipeline;
pub mod tokenizer;
pub mod writer;

pub use chunker::{chunk_document, chunk_documents, chunk_section, slugify};
pub use document::{build_document, parse_name_line, sanitize_page_name};
pub use pipeline::{
    IngestConfig, IngestResult, ProgressReporter, SilentProgress, resolve_source_root,
    run_ingest, run_ingest_with_gateway,
};
pub use tokenizer::{Cl100kTokenizer, Tokenizer, WhitespaceTokenizer, tokenizer_for};
pub use writer::{ArtifactMeta, OutputLayout, RunManifest};
