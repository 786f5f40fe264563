//! Token counting for chunk budgets.

use tiktoken_rs::CoreBPE;
use tracing::warn;

use manpager_shared::{ManpagerError, Result, TokenizerKind};

/// Counts tokens in a piece of text.
pub trait Tokenizer: Send + Sync {
    /// Short name recorded in logs.
    fn name(&self) -> &str;

    fn count(&self, text: &str) -> usize;
}

/// BPE token counts using the `cl100k_base` encoding.
pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    /// Load the encoding tables.
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ManpagerError::config(format!("failed to load cl100k_base: {e}")))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn name(&self) -> &str {
        "cl100k"
    }

    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// One token per run of non-whitespace characters.
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Build the configured tokenizer, falling back to whitespace counting when
/// the BPE tables cannot be loaded.
pub fn tokenizer_for(kind: TokenizerKind) -> Box<dyn Tokenizer> {
    match kind {
        TokenizerKind::Whitespace => Box::new(WhitespaceTokenizer),
        TokenizerKind::Cl100k => match Cl100kTokenizer::new() {
            Ok(tokenizer) => Box::new(tokenizer),
            Err(e) => {
                warn!(error = %e, "falling back to whitespace tokenizer");
                Box::new(WhitespaceTokenizer)
            }
        },
    }
}
