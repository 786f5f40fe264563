//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use manpager_core::pipeline::{IngestConfig, IngestResult, ProgressReporter, run_ingest};
use manpager_shared::{AppConfig, init_config, load_config, load_config_from, validate_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// manpager: turn man-page sources into a retrieval-ready corpus.
#[derive(Parser)]
#[command(
    name = "manpager",
    version,
    about = "Render, parse and chunk man pages into a retrieval-ready corpus.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.manpager/manpager.toml.
    #[arg(long, global = true, env = "MANPAGER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Parse a man-pages tree and write the corpus.
    Ingest(IngestArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `manpager ingest`.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct IngestArgs {
    /// Extracted man-pages tree to read from.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Process at most N man pages.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Reuse the tree recorded by a previous extraction.
    #[arg(long)]
    pub skip_download: bool,

    /// Output directory (overrides `defaults.data_dir`).
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Concurrent parse workers (overrides `defaults.workers`).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Seed for the evaluation-set sampler (overrides `eval.seed`).
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "manpager=info",
        1 => "manpager=debug",
        _ => "manpager=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Ingest(args) => cmd_ingest(config_path.as_deref(), args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

/// Load the config file, honouring `--config`.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Apply `ingest` flag overrides on top of file values.
fn apply_overrides(mut config: AppConfig, args: &IngestArgs) -> Result<AppConfig> {
    if let Some(data_dir) = &args.data_dir {
        config.defaults.data_dir = data_dir.clone();
    }
    if let Some(workers) = args.workers {
        config.defaults.workers = Some(workers);
    }
    if let Some(seed) = args.seed {
        config.eval.seed = Some(seed);
    }
    validate_config(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ingest(config_path: Option<&Path>, args: IngestArgs) -> Result<()> {
    let app = apply_overrides(resolve_config(config_path)?, &args)?;

    let ingest_config = IngestConfig {
        root: args.root,
        skip_download: args.skip_download,
        limit: args.limit,
        app,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(
        root = ?ingest_config.root,
        limit = ?ingest_config.limit,
        data_dir = %ingest_config.app.defaults.data_dir,
        workers = ingest_config.app.defaults.effective_workers(),
        "ingesting man pages"
    );

    let reporter = CliProgress::new();
    let result = match run_ingest(&ingest_config, &reporter).await {
        Ok(result) => result,
        Err(e) => {
            reporter.abandon();
            return Err(e.into());
        }
    };

    // Print summary
    println!();
    println!("  Corpus written successfully!");
    println!("  Run:        {}", result.run_id);
    println!("  Documents:  {}", result.documents);
    println!("  Failures:   {}", result.failures);
    println!("  Chunks:     {}", result.chunks);
    println!("  Oversized:  {}", result.oversized_chunks);
    println!("  Eval items: {}", result.eval_items);
    println!("  Source:     {}", result.source_root.display());
    println!("  Output:     {}", result.data_dir.display());
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: a spinner for phases, a bar while parsing.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    fn abandon(&self) {
        self.bar.abandon();
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn discovered(&self, total: usize) {
        self.bar.set_style(bar_style());
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn file_processed(&self, path: &Path, ok: bool, current: usize, total: usize) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar.set_position(current as u64);
        if ok {
            self.bar.set_message(name);
        } else {
            self.bar.set_message(format!("{name} (failed)"));
        }
        if current == total {
            self.bar.set_style(spinner_style());
        }
    }

    fn done(&self, _result: &IngestResult) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
