//! Derived corpus assets for manpager.
//!
//! Builds the run-level outputs from the parsed documents and their chunks:
//! - [`index`]: per-document index records and the corpus summary
//! - [`aliases`]: alias → canonical page map
//! - [`hints`]: static section-synonym table
//! - [`eval`]: synthetic retrieval questions
//! - [`quality`]: token statistics and coverage report
//!
//! Everything here is pure; writing files is the caller's job.

pub mod aliases;
pub mod eval;
pub mod hints;
pub mod index;
pub mod quality;

pub use aliases::{AliasEntry, build_alias_map};
pub use eval::build_eval_set;
pub use hints::{
    RECOGNIZED_SECTIONS, SECTION_SYNONYMS, SectionHints, build_section_hints, canonical_section,
};
pub use index::{DocumentIndexRecord, DocumentSummary};
pub use quality::{QualityReport, build_quality_report, percentile};
