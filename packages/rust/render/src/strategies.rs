//! Renderer tiers and the ordered chain they are tried in.

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::debug;

use manpager_shared::{ManpagerError, RenderConfig, Result};

use crate::tools::find_in_path;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The file handed to a renderer after `.so` resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    /// File to render.
    pub path: PathBuf,
    /// Directory relative `.so` lookups should happen from, when known.
    pub working_dir: Option<PathBuf>,
}

impl RenderTarget {
    /// A target rendered in place, without a working directory.
    pub fn direct(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            working_dir: None,
        }
    }

    /// Path argument plus working directory for tools that resolve
    /// includes relative to their cwd.
    ///
    /// With a known working directory the bare file name is passed and the
    /// tool runs inside that directory.
    pub fn relative_arg(&self) -> (OsString, Option<PathBuf>) {
        match (&self.working_dir, self.path.file_name()) {
            (Some(dir), Some(name)) => (name.to_os_string(), Some(dir.clone())),
            _ => (self.path.clone().into_os_string(), None),
        }
    }
}

/// A fully specified subprocess call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

/// One tier of the renderer fallback chain.
///
/// Strategies only describe the command; running it, enforcing the deadline,
/// and judging the output is the gateway's job.
pub trait RenderStrategy: Send + Sync {
    /// Short tool name for logs and error messages.
    fn name(&self) -> &str;

    /// Build the command that renders `target`.
    fn invocation(&self, target: &RenderTarget) -> Invocation;
}

// ---------------------------------------------------------------------------
// Built-in strategies
// ---------------------------------------------------------------------------

/// `mandoc -T markdown <target>`.
pub struct MandocStrategy {
    program: String,
}

impl MandocStrategy {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl RenderStrategy for MandocStrategy {
    fn name(&self) -> &str {
        "mandoc"
    }

    fn invocation(&self, target: &RenderTarget) -> Invocation {
        Invocation {
            program: self.program.clone(),
            args: vec!["-T".into(), "markdown".into(), target.path.clone().into()],
            cwd: None,
        }
    }
}

/// `mandoc -T json <target>`, used for the optional AST output.
pub struct MandocAstStrategy {
    program: String,
}

impl MandocAstStrategy {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl RenderStrategy for MandocAstStrategy {
    fn name(&self) -> &str {
        "mandoc-json"
    }

    fn invocation(&self, target: &RenderTarget) -> Invocation {
        Invocation {
            program: self.program.clone(),
            args: vec!["-T".into(), "json".into(), target.path.clone().into()],
            cwd: None,
        }
    }
}

/// `pandoc -f man -t gfm <target>`.
pub struct PandocStrategy {
    program: String,
}

impl PandocStrategy {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl RenderStrategy for PandocStrategy {
    fn name(&self) -> &str {
        "pandoc"
    }

    fn invocation(&self, target: &RenderTarget) -> Invocation {
        let (arg, cwd) = target.relative_arg();
        Invocation {
            program: self.program.clone(),
            args: vec!["-f".into(), "man".into(), "-t".into(), "gfm".into(), arg],
            cwd,
        }
    }
}

/// `groff -T utf8 -man <target>`.
pub struct GroffStrategy {
    program: String,
}

impl GroffStrategy {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl RenderStrategy for GroffStrategy {
    fn name(&self) -> &str {
        "groff"
    }

    fn invocation(&self, target: &RenderTarget) -> Invocation {
        let (arg, cwd) = target.relative_arg();
        Invocation {
            program: self.program.clone(),
            args: vec!["-T".into(), "utf8".into(), "-man".into(), arg],
            cwd,
        }
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Holds renderer strategies in fallback order.
pub struct RendererChain {
    strategies: Vec<Box<dyn RenderStrategy>>,
}

impl RendererChain {
    /// Create a chain from explicit strategies, tried first to last.
    pub fn new(strategies: Vec<Box<dyn RenderStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the standard mandoc → pandoc → groff chain.
    ///
    /// `mandoc` must be on `PATH`; optional tools that are missing are left
    /// out of the chain.
    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        let mandoc = find_in_path(&config.mandoc).ok_or_else(|| ManpagerError::MissingTool {
            tool: config.mandoc.clone(),
        })?;

        let mut strategies: Vec<Box<dyn RenderStrategy>> =
            vec![Box::new(MandocStrategy::new(mandoc.to_string_lossy()))];

        match find_in_path(&config.pandoc) {
            Some(path) => strategies.push(Box::new(PandocStrategy::new(path.to_string_lossy()))),
            None => debug!(tool = %config.pandoc, "optional renderer not found"),
        }
        match find_in_path(&config.groff) {
            Some(path) => strategies.push(Box::new(GroffStrategy::new(path.to_string_lossy()))),
            None => debug!(tool = %config.groff, "optional renderer not found"),
        }

        Ok(Self::new(strategies))
    }

    /// Tier names in order.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn RenderStrategy> {
        self.strategies.iter().map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandoc_uses_full_path_without_cwd() {
        let target = RenderTarget {
            path: "/src/man3/getcwd.3".into(),
            working_dir: Some("/src/man3".into()),
        };
        let inv = MandocStrategy::new("mandoc").invocation(&target);
        assert_eq!(inv.args, vec!["-T", "markdown", "/src/man3/getcwd.3"]);
        assert_eq!(inv.cwd, None);
    }

    #[test]
    fn fallbacks_use_bare_name_inside_working_dir() {
        let target = RenderTarget {
            path: "/src/man3/getcwd.3".into(),
            working_dir: Some("/src/man3".into()),
        };

        let inv = PandocStrategy::new("pandoc").invocation(&target);
        assert_eq!(inv.args, vec!["-f", "man", "-t", "gfm", "getcwd.3"]);
        assert_eq!(inv.cwd, Some(PathBuf::from("/src/man3")));

        let inv = GroffStrategy::new("groff").invocation(&target);
        assert_eq!(inv.args, vec!["-T", "utf8", "-man", "getcwd.3"]);
        assert_eq!(inv.cwd, Some(PathBuf::from("/src/man3")));
    }

    #[test]
    fn fallbacks_use_full_path_for_direct_targets() {
        let target = RenderTarget::direct("/src/man1/ls.1");
        let inv = GroffStrategy::new("groff").invocation(&target);
        assert_eq!(inv.args.last().unwrap(), "/src/man1/ls.1");
        assert_eq!(inv.cwd, None);
    }

    #[test]
    fn chain_requires_mandoc() {
        let config = RenderConfig {
            mandoc: "manpager-no-such-mandoc".into(),
            ..RenderConfig::default()
        };
        let err = RendererChain::from_config(&config).err().unwrap();
        assert!(matches!(err, ManpagerError::MissingTool { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn chain_skips_missing_optional_tools() {
        // `sh` stands in for mandoc so the test does not depend on it.
        let config = RenderConfig {
            mandoc: "sh".into(),
            pandoc: "manpager-no-such-pandoc".into(),
            groff: "manpager-no-such-groff".into(),
            ..RenderConfig::default()
        };
        let chain = RendererChain::from_config(&config).unwrap();
        assert_eq!(chain.names(), vec!["mandoc"]);
        assert_eq!(chain.len(), 1);
    }
}
