//! Application configuration for manpager.
//!
//! User config lives at `~/.manpager/manpager.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ManpagerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "manpager.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".manpager";

/// Upper bound on the default worker pool size.
pub const MAX_DEFAULT_WORKERS: usize = 8;

// ---------------------------------------------------------------------------
// Config structs (matching manpager.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// External renderer settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Chunk budget settings.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Evaluation set settings.
    #[serde(default)]
    pub eval: EvalConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory for all pipeline outputs.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Man-pages release tag embedded in every document id.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,

    /// Parse worker count. Defaults to `min(8, available parallelism)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            version_tag: default_version_tag(),
            workers: None,
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_version_tag() -> String {
    "6.9".into()
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Primary man-page formatter (mandatory).
    #[serde(default = "default_mandoc")]
    pub mandoc: String,

    /// Document converter used as first fallback.
    #[serde(default = "default_pandoc")]
    pub pandoc: String,

    /// Roff formatter used as last fallback.
    #[serde(default = "default_groff")]
    pub groff: String,

    /// Deadline for each external tool invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Also write the mandoc JSON AST next to each document.
    #[serde(default = "default_true")]
    pub emit_ast: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mandoc: default_mandoc(),
            pandoc: default_pandoc(),
            groff: default_groff(),
            timeout_secs: default_timeout_secs(),
            emit_ast: true,
        }
    }
}

fn default_mandoc() -> String {
    "mandoc".into()
}
fn default_pandoc() -> String {
    "pandoc".into()
}
fn default_groff() -> String {
    "groff".into()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_true() -> bool {
    true
}

/// Tokenizer used to measure chunk budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// BPE `cl100k_base` encoding.
    Cl100k,
    /// One token per whitespace-delimited word.
    Whitespace,
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunks are assembled up to this many tokens.
    #[serde(default = "default_target_tokens")]
    pub target_tokens: usize,

    /// Chunks above this size are reported as oversized.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Tokens carried from the end of one chunk into the next.
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,

    #[serde(default = "default_tokenizer")]
    pub tokenizer: TokenizerKind,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_tokens: default_target_tokens(),
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap_tokens(),
            tokenizer: default_tokenizer(),
        }
    }
}

fn default_target_tokens() -> usize {
    550
}
fn default_max_tokens() -> usize {
    700
}
fn default_overlap_tokens() -> usize {
    60
}
fn default_tokenizer() -> TokenizerKind {
    TokenizerKind::Cl100k
}

/// `[eval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Maximum number of items in the evaluation set.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Cap on errno questions generated per document.
    #[serde(default = "default_errno_per_document")]
    pub errno_per_document: usize,

    /// Seed for the shuffle; random when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            errno_per_document: default_errno_per_document(),
            seed: None,
        }
    }
}

fn default_max_items() -> usize {
    200
}
fn default_errno_per_document() -> usize {
    3
}

impl DefaultsConfig {
    /// Effective worker count: the configured value, or `min(8, cores)`.
    pub fn effective_workers(&self) -> usize {
        self.workers.filter(|w| *w > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .min(MAX_DEFAULT_WORKERS)
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.manpager/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ManpagerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.manpager/manpager.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ManpagerError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| ManpagerError::config(format!("failed to parse {}: {e}", path.display())))?;

    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ManpagerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ManpagerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ManpagerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject settings that would produce malformed ids or a degenerate chunker.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let tag = &config.defaults.version_tag;
    if tag.trim().is_empty() || tag.contains(':') {
        return Err(ManpagerError::config(format!(
            "version_tag must be non-empty and must not contain ':' (got {tag:?})"
        )));
    }

    let chunking = &config.chunking;
    if chunking.target_tokens == 0 {
        return Err(ManpagerError::config("chunking.target_tokens must be > 0"));
    }
    if chunking.target_tokens > chunking.max_tokens {
        return Err(ManpagerError::config(format!(
            "chunking.target_tokens ({}) exceeds chunking.max_tokens ({})",
            chunking.target_tokens, chunking.max_tokens
        )));
    }
    if chunking.overlap_tokens >= chunking.target_tokens {
        return Err(ManpagerError::config(
            "chunking.overlap_tokens must be smaller than chunking.target_tokens",
        ));
    }

    if config.render.timeout_secs == 0 {
        return Err(ManpagerError::config("render.timeout_secs must be > 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("mandoc"));
        assert!(toml_str.contains("cl100k"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.chunking.target_tokens, 550);
        assert_eq!(parsed.chunking.max_tokens, 700);
        assert_eq!(parsed.chunking.overlap_tokens, 60);
        assert_eq!(parsed.eval.max_items, 200);
        assert_eq!(parsed.defaults.version_tag, "6.9");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
data_dir = "/tmp/manpager"

[chunking]
tokenizer = "whitespace"

[eval]
seed = 7
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.data_dir, "/tmp/manpager");
        assert_eq!(config.chunking.tokenizer, TokenizerKind::Whitespace);
        assert_eq!(config.chunking.target_tokens, 550);
        assert_eq!(config.eval.seed, Some(7));
        assert_eq!(config.render.groff, "groff");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn validation_rejects_colon_in_version() {
        let mut config = AppConfig::default();
        config.defaults.version_tag = "6:9".into();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("version_tag"));
    }

    #[test]
    fn validation_rejects_bad_budget() {
        let mut config = AppConfig::default();
        config.chunking.target_tokens = 800;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.chunking.overlap_tokens = 550;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn effective_workers_is_bounded() {
        let defaults = DefaultsConfig::default();
        let workers = defaults.effective_workers();
        assert!(workers >= 1 && workers <= MAX_DEFAULT_WORKERS);

        let defaults = DefaultsConfig {
            workers: Some(2),
            ..DefaultsConfig::default()
        };
        assert_eq!(defaults.effective_workers(), 2);
    }
}
