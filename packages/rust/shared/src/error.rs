//! Error types for manpager.
//!
//! Library crates use [`ManpagerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all manpager operations.
#[derive(Debug, thiserror::Error)]
pub enum ManpagerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A mandatory external tool is not available on `PATH`.
    #[error("required tool `{tool}` not found in PATH")]
    MissingTool { tool: String },

    /// Every renderer in the fallback chain failed for a source file.
    #[error("render failed for {path:?}: {message}")]
    Render { path: PathBuf, message: String },

    /// A renderer exceeded its deadline and no later tier succeeded.
    #[error("render timed out for {path:?}: `{tool}` exceeded {timeout_secs}s")]
    RenderTimeout {
        path: PathBuf,
        tool: String,
        timeout_secs: u64,
    },

    /// Rendered text could not be turned into a document.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad identifier, empty corpus, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ManpagerError>;

impl ManpagerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a render failure for a source file.
    pub fn render(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Render {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that make every further document impossible to produce.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingTool { .. } | Self::Config { .. })
    }
}

impl From<serde_json::Error> for ManpagerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
