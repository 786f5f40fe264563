//! Renderer gateway for manpager.
//!
//! Turns a man-page source into markdown-ish text by resolving `.so`
//! indirection and then trying external renderers in fallback order:
//! - [`RendererChain`]: ordered [`RenderStrategy`] tiers (mandoc, pandoc, groff)
//! - [`indirection`]: `.so` chain resolution with cycle detection
//! - [`RenderGateway`]: runs the chain with per-call timeouts

pub mod indirection;
pub mod strategies;
pub mod tools;

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use manpager_shared::{ManpagerError, RenderConfig, Result};

pub use indirection::{Resolution, TempRedirect, resolve};
pub use strategies::{
    GroffStrategy, Invocation, MandocAstStrategy, MandocStrategy, PandocStrategy,
    RenderStrategy, RenderTarget, RendererChain,
};
pub use tools::find_in_path;

/// Successful render of one source file.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Rendered text (never blank).
    pub text: String,
    /// Name of the tier that produced it.
    pub renderer: String,
}

/// Why a single tier did not produce output.
#[derive(Debug)]
enum TierFailure {
    TimedOut,
    Failed(String),
}

// ---------------------------------------------------------------------------
// RenderGateway
// ---------------------------------------------------------------------------

/// Runs the renderer chain for one source file at a time.
///
/// Shared across parse workers behind an `Arc`; holds no per-call state.
pub struct RenderGateway {
    chain: RendererChain,
    ast: Option<Box<dyn RenderStrategy>>,
    timeout: Duration,
}

impl RenderGateway {
    /// Create a gateway from an explicit chain.
    pub fn new(chain: RendererChain, timeout: Duration) -> Self {
        Self {
            chain,
            ast: None,
            timeout,
        }
    }

    /// Build the standard gateway. Fails with `MissingTool` if mandoc is absent.
    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        let chain = RendererChain::from_config(config)?;
        let mut gateway = Self::new(chain, Duration::from_secs(config.timeout_secs));

        if config.emit_ast {
            if let Some(mandoc) = find_in_path(&config.mandoc) {
                gateway = gateway.with_ast_strategy(Box::new(MandocAstStrategy::new(
                    mandoc.to_string_lossy(),
                )));
            }
        }

        Ok(gateway)
    }

    /// Use `strategy` for [`RenderGateway::render_ast`].
    pub fn with_ast_strategy(mut self, strategy: Box<dyn RenderStrategy>) -> Self {
        self.ast = Some(strategy);
        self
    }

    /// Tier names in fallback order.
    pub fn renderers(&self) -> Vec<&str> {
        self.chain.names()
    }

    /// Render `source`, trying each tier until one yields non-blank output.
    #[instrument(skip_all, fields(source = %source.display()))]
    pub async fn render(&self, source: &Path) -> Result<RenderOutput> {
        // The resolution owns any redirect file and must outlive every tier.
        let resolution = resolve(source)?;
        let Some(target) = resolution.render_target(source) else {
            return Err(ManpagerError::render(source, "circular .so chain"));
        };

        let mut attempts: Vec<String> = Vec::new();
        let mut timed_out: Option<String> = None;

        for strategy in self.chain.iter() {
            let invocation = strategy.invocation(&target);
            match run(&invocation, self.timeout).await {
                Ok(text) => {
                    debug!(renderer = strategy.name(), bytes = text.len(), "rendered");
                    return Ok(RenderOutput {
                        text,
                        renderer: strategy.name().to_string(),
                    });
                }
                Err(TierFailure::TimedOut) => {
                    warn!(
                        renderer = strategy.name(),
                        timeout_secs = self.timeout.as_secs(),
                        "renderer timed out"
                    );
                    attempts.push(format!("{}: timed out", strategy.name()));
                    timed_out.get_or_insert_with(|| strategy.name().to_string());
                }
                Err(TierFailure::Failed(reason)) => {
                    debug!(renderer = strategy.name(), %reason, "renderer failed");
                    attempts.push(format!("{}: {reason}", strategy.name()));
                }
            }
        }

        drop(resolution);

        if let Some(tool) = timed_out {
            return Err(ManpagerError::RenderTimeout {
                path: source.to_path_buf(),
                tool,
                timeout_secs: self.timeout.as_secs(),
            });
        }

        Err(ManpagerError::render(
            source,
            format!("all renderers failed ({})", attempts.join("; ")),
        ))
    }

    /// Render the mandoc JSON AST for `source`, if configured and successful.
    #[instrument(skip_all, fields(source = %source.display()))]
    pub async fn render_ast(&self, source: &Path) -> Option<String> {
        let strategy = self.ast.as_ref()?;

        let resolution = match resolve(source) {
            Ok(resolution) => resolution,
            Err(e) => {
                debug!(error = %e, "ast render skipped");
                return None;
            }
        };
        let target = resolution.render_target(source)?;

        match run(&strategy.invocation(&target), self.timeout).await {
            Ok(json) => Some(json),
            Err(failure) => {
                debug!(?failure, "ast render failed");
                None
            }
        }
    }
}

/// Run one invocation under `deadline`. The child is killed if the deadline
/// passes.
async fn run(invocation: &Invocation, deadline: Duration) -> std::result::Result<String, TierFailure> {
    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &invocation.cwd {
        command.current_dir(dir);
    }

    let child = command
        .spawn()
        .map_err(|e| TierFailure::Failed(format!("spawn failed: {e}")))?;

    let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Err(_) => return Err(TierFailure::TimedOut),
        Ok(Err(e)) => return Err(TierFailure::Failed(e.to_string())),
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let first = stderr.lines().next().unwrap_or_default().trim();
        return Err(TierFailure::Failed(format!("{} {first}", output.status)));
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    if text.trim().is_empty() {
        return Err(TierFailure::Failed("empty output".into()));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    /// Runs a shell snippet with the target path as `$1`.
    struct ShellStrategy {
        name: &'static str,
        script: &'static str,
    }

    impl RenderStrategy for ShellStrategy {
        fn name(&self) -> &str {
            self.name
        }

        fn invocation(&self, target: &RenderTarget) -> Invocation {
            let (arg, cwd) = target.relative_arg();
            Invocation {
                program: "sh".into(),
                args: vec!["-c".into(), self.script.into(), "sh".into(), arg],
                cwd,
            }
        }
    }

    fn shell(name: &'static str, script: &'static str) -> Box<dyn RenderStrategy> {
        Box::new(ShellStrategy { name, script })
    }

    fn gateway(tiers: Vec<Box<dyn RenderStrategy>>, timeout: Duration) -> RenderGateway {
        RenderGateway::new(RendererChain::new(tiers), timeout)
    }

    fn temp_dir() -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("manpager-render-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(dir.join("man1")).unwrap();
        std::fs::create_dir_all(dir.join("man3")).unwrap();
        dir
    }

    #[tokio::test]
    async fn first_successful_tier_wins() {
        let tmp = temp_dir();
        let page = tmp.join("man1/ls.1");
        std::fs::write(&page, "# NAME\nls - list directory contents\n").unwrap();

        let gw = gateway(
            vec![
                shell("broken", "exit 3"),
                shell("blank", "echo '   '"),
                shell("cat", "cat \"$1\""),
                shell("never", "echo unreachable"),
            ],
            Duration::from_secs(10),
        );

        let out = gw.render(&page).await.unwrap();
        assert_eq!(out.renderer, "cat");
        assert!(out.text.contains("list directory contents"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn all_tiers_failing_is_render_error() {
        let tmp = temp_dir();
        let page = tmp.join("man1/ls.1");
        std::fs::write(&page, ".TH LS 1\n").unwrap();

        let gw = gateway(
            vec![shell("one", "exit 1"), shell("two", "exit 2")],
            Duration::from_secs(10),
        );

        let err = gw.render(&page).await.unwrap_err();
        assert!(matches!(err, ManpagerError::Render { .. }));
        let message = err.to_string();
        assert!(message.contains("one:"));
        assert!(message.contains("two:"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn timeout_falls_through_to_next_tier() {
        let tmp = temp_dir();
        let page = tmp.join("man1/ls.1");
        std::fs::write(&page, "# NAME\nls\n").unwrap();

        let gw = gateway(
            vec![shell("slow", "sleep 5"), shell("cat", "cat \"$1\"")],
            Duration::from_millis(200),
        );

        let out = gw.render(&page).await.unwrap();
        assert_eq!(out.renderer, "cat");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn timeout_without_success_is_render_timeout() {
        let tmp = temp_dir();
        let page = tmp.join("man1/ls.1");
        std::fs::write(&page, "# NAME\nls\n").unwrap();

        let gw = gateway(
            vec![shell("slow", "sleep 5"), shell("broken", "exit 1")],
            Duration::from_millis(200),
        );

        match gw.render(&page).await.unwrap_err() {
            ManpagerError::RenderTimeout { tool, .. } => assert_eq!(tool, "slow"),
            other => panic!("expected RenderTimeout, got {other:?}"),
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn so_alias_renders_target_page() {
        let tmp = temp_dir();
        let alias = tmp.join("man3/getwd.3");
        std::fs::write(&alias, ".so man3/getcwd.3\n").unwrap();
        std::fs::write(tmp.join("man3/getcwd.3"), "# NAME\ngetcwd - cwd\n").unwrap();

        let gw = gateway(vec![shell("cat", "cat \"$1\"")], Duration::from_secs(10));
        let out = gw.render(&alias).await.unwrap();
        assert!(out.text.contains("getcwd - cwd"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn missing_so_target_fails_without_leaving_redirect() {
        let tmp = temp_dir();
        let alias = tmp.join("man3/getwd.3");
        std::fs::write(&alias, ".so man3/nowhere.3\n").unwrap();

        // `cat` of the redirect prints `.so nowhere.3`, so reject it explicitly.
        let gw = gateway(
            vec![shell("strict", "grep -qv '^.so' \"$1\" && cat \"$1\"")],
            Duration::from_secs(10),
        );
        let err = gw.render(&alias).await.unwrap_err();
        assert!(matches!(err, ManpagerError::Render { .. }));
        assert!(!tmp.join("man3/.temp_getwd.3").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn circular_chain_is_render_error() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("man3/a.3"), ".so b.3\n").unwrap();
        std::fs::write(tmp.join("man3/b.3"), ".so a.3\n").unwrap();

        let gw = gateway(vec![shell("cat", "cat \"$1\"")], Duration::from_secs(10));
        let err = gw.render(&tmp.join("man3/a.3")).await.unwrap_err();
        assert!(err.to_string().contains("circular"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn ast_is_optional() {
        let tmp = temp_dir();
        let page = tmp.join("man1/ls.1");
        std::fs::write(&page, "{\"ast\":true}\n").unwrap();

        let gw = gateway(vec![shell("cat", "cat \"$1\"")], Duration::from_secs(10));
        assert_eq!(gw.render_ast(&page).await, None);

        let gw = gw.with_ast_strategy(shell("json", "cat \"$1\""));
        let ast = gw.render_ast(&page).await.unwrap();
        assert!(ast.contains("\"ast\""));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
