//! Shared types, error model, and configuration for manpager.
//!
//! This crate is the foundation depended on by all other manpager crates.
//! It provides:
//! - [`ManpagerError`]: the unified error type
//! - Domain types ([`ManDoc`], [`Subsection`], [`Chunk`], [`EvaluationItem`], [`DocumentId`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkingConfig, DefaultsConfig, EvalConfig, MAX_DEFAULT_WORKERS, RenderConfig,
    TokenizerKind, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_config,
};
pub use error::{ManpagerError, Result};
pub use types::{
    Chunk, DOCUMENT_ID_PREFIX, DocumentId, EvaluationItem, ManDoc, RunId, Subsection,
};
