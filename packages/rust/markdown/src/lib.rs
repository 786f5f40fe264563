//! Rendered-text normalization and structural parsing.
//!
//! Renderer output is normalized with a series of cleanup passes, split into
//! an ordered map of `#`-headed sections, and further split into prose and
//! code blocks for the chunker:
//! - [`normalize`]: whitespace cleanup that leaves code untouched
//! - [`parse_sections`]: heading-delimited [`SectionMap`]
//! - [`split_blocks`]: paragraph / code [`Block`]s
//! - [`refs`]: `name(section)` cross references and constant names

mod blocks;
mod normalize;
pub mod refs;
mod sections;

pub use blocks::{Block, split_blocks};
pub use normalize::normalize;
pub use refs::{extract_constants, extract_see_also_refs};
pub use sections::{SectionMap, parse_sections};
