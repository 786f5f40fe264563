//! Token-budgeted chunking of document sections.
//!
//! Each subsection is split into paragraph and code blocks, which are packed
//! into chunks up to the target budget. When a chunk is flushed, its trailing
//! words seed the next one so neighbouring chunks share a little context.
//! Blocks are never split, so a single large block becomes one oversized chunk.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use manpager_markdown::{extract_constants, extract_see_also_refs, split_blocks};
use manpager_shared::{Chunk, ChunkingConfig, ManDoc};

use crate::tokenizer::Tokenizer;

/// Maximum anchor slug length.
pub const SLUG_MAX_LEN: usize = 64;

/// Section name used when a subsection has none.
const DEFAULT_SECTION_NAME: &str = "SECTION";

static DASHES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[—–]").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static MULTI_DASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));
static PIECES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+|\s+").expect("valid regex"));

/// Anchor-safe slug: lowercase ASCII letters, digits, `-` and `_`.
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let dashed = DASHES_RE.replace_all(&lowered, "-");
    let dashed = WHITESPACE_RE.replace_all(&dashed, "-");

    let kept: String = dashed
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_')
        .collect();
    let collapsed = MULTI_DASH_RE.replace_all(&kept, "-");

    let truncated: String = collapsed.chars().take(SLUG_MAX_LEN).collect();
    truncated.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Trailing part of `text` holding at most `k` tokens, cut at word boundaries.
///
/// Returns the whole text when it already fits. At least one word is kept even
/// if it alone exceeds `k`.
pub fn take_last_tokens(text: &str, tokenizer: &dyn Tokenizer, k: usize) -> String {
    if k == 0 {
        return String::new();
    }
    if tokenizer.count(text) <= k {
        return text.to_string();
    }

    let pieces: Vec<&str> = PIECES_RE.find_iter(text).map(|m| m.as_str()).collect();
    let mut kept: Vec<&str> = Vec::new();
    let mut count = 0;

    for piece in pieces.into_iter().rev() {
        if piece.trim().is_empty() {
            kept.push(piece);
            continue;
        }
        let tokens = tokenizer.count(piece);
        if count + tokens > k && count > 0 {
            break;
        }
        kept.push(piece);
        count += tokens;
    }

    kept.reverse();
    kept.concat().trim_start().to_string()
}

/// Chunk every subsection of every document, in order.
#[instrument(skip_all, fields(documents = docs.len(), tokenizer = tokenizer.name()))]
pub fn chunk_documents(
    docs: &[ManDoc],
    config: &ChunkingConfig,
    tokenizer: &dyn Tokenizer,
) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = docs
        .iter()
        .flat_map(|doc| chunk_document(doc, config, tokenizer))
        .collect();
    debug!(chunks = chunks.len(), "chunking complete");
    chunks
}

/// Chunk one document's subsections, skipping blank ones.
pub fn chunk_document(
    doc: &ManDoc,
    config: &ChunkingConfig,
    tokenizer: &dyn Tokenizer,
) -> Vec<Chunk> {
    doc.subsections
        .iter()
        .filter(|sub| !sub.raw_text.trim().is_empty())
        .flat_map(|sub| {
            let name = sub.subsection_name.trim().to_uppercase();
            let name = if name.is_empty() {
                DEFAULT_SECTION_NAME.to_string()
            } else {
                name
            };
            chunk_section(doc, &name, &sub.raw_text, config, tokenizer)
        })
        .collect()
}

/// Pack one section's blocks into chunks.
pub fn chunk_section(
    doc: &ManDoc,
    section_name: &str,
    text: &str,
    config: &ChunkingConfig,
    tokenizer: &dyn Tokenizer,
) -> Vec<Chunk> {
    let mut slug = slugify(section_name);
    if slug.is_empty() {
        slug = slugify(DEFAULT_SECTION_NAME);
    }
    let mut emitter = Emitter {
        doc,
        section_name,
        anchor_base: format!("{}-{}-{slug}", doc.page_name, doc.section),
        seq: 1,
        tokenizer,
        chunks: Vec::new(),
    };

    let mut buffer: Vec<String> = Vec::new();
    let mut buffer_tokens = 0;

    for block in split_blocks(text) {
        let block_text = block.text.trim();
        if block_text.is_empty() {
            continue;
        }
        let block_tokens = tokenizer.count(block_text);

        if buffer.is_empty() || buffer_tokens + block_tokens <= config.target_tokens {
            buffer.push(block_text.to_string());
            buffer_tokens += block_tokens;
            continue;
        }

        if let Some(emitted) = emitter.emit(&buffer) {
            let overlap = take_last_tokens(&emitted, tokenizer, config.overlap_tokens);
            buffer.clear();
            buffer_tokens = 0;
            if !overlap.is_empty() {
                buffer_tokens = tokenizer.count(&overlap);
                buffer.push(overlap);
            }
        }

        buffer.push(block_text.to_string());
        buffer_tokens += block_tokens;
    }

    emitter.emit(&buffer);
    emitter.chunks
}

/// Builds chunks for one section with sequential anchors.
struct Emitter<'a> {
    doc: &'a ManDoc,
    section_name: &'a str,
    anchor_base: String,
    seq: usize,
    tokenizer: &'a dyn Tokenizer,
    chunks: Vec<Chunk>,
}

impl Emitter<'_> {
    /// Emit the buffer as a chunk. Returns its text, or `None` if it was blank.
    fn emit(&mut self, buffer: &[String]) -> Option<String> {
        let text = buffer.join("\n\n").trim().to_string();
        if text.is_empty() {
            return None;
        }

        self.chunks.push(Chunk {
            document_id: self.doc.document_id.clone(),
            section_name: self.section_name.to_string(),
            anchor: format!("{}-{:02}", self.anchor_base, self.seq),
            token_count: self.tokenizer.count(&text),
            see_also_refs: extract_see_also_refs(&text),
            constants: extract_constants(&text),
            text: text.clone(),
        });
        self.seq += 1;
        Some(text)
    }
}
