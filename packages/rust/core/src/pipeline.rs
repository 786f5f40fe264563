//! End-to-end `ingest` pipeline: source tree → render → parse → documents →
//! chunks → corpus assets → run manifest.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use manpager_discovery::{SourceFile, discover_man_files};
use manpager_markdown::{normalize, parse_sections};
use manpager_render::RenderGateway;
use manpager_shared::{AppConfig, ManDoc, ManpagerError, Result, RunId, validate_config};

use crate::chunker::chunk_documents;
use crate::document::build_document;
use crate::tokenizer::tokenizer_for;
use crate::writer::{OutputLayout, RunManifest, write_corpus_assets, write_document, write_manifest};

/// Configuration for one `ingest` run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Extracted man-pages tree to read from.
    pub root: Option<PathBuf>,
    /// Reuse the tree recorded by a previous extraction.
    pub skip_download: bool,
    /// Process at most this many source files.
    pub limit: Option<usize>,
    /// Effective application config (file values with CLI overrides applied).
    pub app: AppConfig,
    /// Tool version string.
    pub tool_version: String,
}

/// Result of the `ingest` pipeline.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub run_id: RunId,
    pub source_root: PathBuf,
    pub data_dir: PathBuf,
    /// Documents parsed successfully.
    pub documents: usize,
    /// Source files that failed to render, parse or write.
    pub failures: usize,
    pub chunks: usize,
    pub eval_items: usize,
    /// Chunks above the configured `max_tokens`.
    pub oversized_chunks: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once discovery knows how many files will be parsed.
    fn discovered(&self, total: usize);
    /// Called as each source file finishes, in completion order.
    fn file_processed(&self, path: &Path, ok: bool, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &IngestResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn discovered(&self, _total: usize) {}
    fn file_processed(&self, _path: &Path, _ok: bool, _current: usize, _total: usize) {}
    fn done(&self, _result: &IngestResult) {}
}

/// Pick the source tree: `--root` wins, then the recorded extraction marker.
pub fn resolve_source_root(config: &IngestConfig, layout: &OutputLayout) -> Result<PathBuf> {
    if let Some(root) = &config.root {
        if !root.is_dir() {
            return Err(ManpagerError::config(format!(
                "--root path does not exist: {}",
                root.display()
            )));
        }
        return std::fs::canonicalize(root).map_err(|e| ManpagerError::io(root, e));
    }

    if !config.skip_download {
        return Err(ManpagerError::config(
            "no source tree: pass --root, or --skip-download to reuse a previous extraction",
        ));
    }

    let marker = layout.extracted_root_marker(&config.app.defaults.version_tag);
    let recorded = std::fs::read_to_string(&marker).map_err(|_| {
        ManpagerError::config(format!(
            "no extracted root recorded at {}; provide --root",
            marker.display()
        ))
    })?;

    let root = PathBuf::from(recorded.trim());
    if !root.is_dir() {
        return Err(ManpagerError::config(format!(
            "recorded extracted root no longer exists: {}",
            root.display()
        )));
    }
    info!(root = %root.display(), "using previously extracted root");
    Ok(root)
}

/// Run the full `ingest` pipeline with the renderers found on `PATH`.
///
/// Fails before any work if mandoc is not installed.
pub async fn run_ingest(
    config: &IngestConfig,
    progress: &dyn ProgressReporter,
) -> Result<IngestResult> {
    let gateway = RenderGateway::from_config(&config.app.render)?;
    run_ingest_with_gateway(config, Arc::new(gateway), progress).await
}

/// Run the `ingest` pipeline with an explicit renderer gateway.
///
/// 1. Resolve the source tree and discover man files
/// 2. Render, parse and write each file on a bounded worker pool
/// 3. Chunk every document
/// 4. Write the chunk corpus, derived assets and run manifest
#[instrument(skip_all, fields(data_dir = %config.app.defaults.data_dir, version = %config.app.defaults.version_tag))]
pub async fn run_ingest_with_gateway(
    config: &IngestConfig,
    gateway: Arc<RenderGateway>,
    progress: &dyn ProgressReporter,
) -> Result<IngestResult> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();

    validate_config(&config.app)?;

    let layout = OutputLayout::new(&config.app.defaults.data_dir);
    let source_root = resolve_source_root(config, &layout)?;

    info!(%run_id, root = %source_root.display(), "starting ingest pipeline");

    // --- Phase 1: Discovery ---
    progress.phase("Discovering man pages");
    let files = discover_man_files(&source_root, config.limit)?;
    progress.discovered(files.len());
    info!(files = files.len(), "man files discovered");

    layout.create_dirs()?;

    // --- Phase 2: Parse ---
    progress.phase("Parsing man pages");
    let context = Arc::new(ParseContext {
        gateway: Arc::clone(&gateway),
        layout: layout.clone(),
        version_tag: config.app.defaults.version_tag.clone(),
        emit_ast: config.app.render.emit_ast,
    });
    let workers = config.app.defaults.effective_workers();
    let (docs, failures) = parse_all(files, context, workers, progress).await;

    if docs.is_empty() {
        return Err(ManpagerError::validation(format!(
            "no documents parsed ({failures} failures)"
        )));
    }

    // --- Phase 3: Chunk ---
    progress.phase("Chunking documents");
    let tokenizer = tokenizer_for(config.app.chunking.tokenizer);
    let chunks = chunk_documents(&docs, &config.app.chunking, tokenizer.as_ref());

    // --- Phase 4: Assets ---
    progress.phase("Writing corpus assets");
    let assets = write_corpus_assets(&layout, &run_id, &docs, &chunks, &config.app);

    let manifest = RunManifest {
        run_id: run_id.clone(),
        tool_version: config.tool_version.clone(),
        version_tag: config.app.defaults.version_tag.clone(),
        source_root: source_root.display().to_string(),
        renderers: gateway.renderers().into_iter().map(String::from).collect(),
        started_at,
        completed_at: Utc::now(),
        documents: docs.len(),
        failures,
        chunks: chunks.len(),
        eval_items: assets.eval_items,
        artifacts: assets.artifacts,
    };
    if let Err(e) = write_manifest(&layout, &manifest) {
        warn!(error = %e, "failed to write run manifest");
    }

    let result = IngestResult {
        run_id,
        source_root,
        data_dir: layout.root().to_path_buf(),
        documents: docs.len(),
        failures,
        chunks: chunks.len(),
        eval_items: assets.eval_items,
        oversized_chunks: assets.oversized_chunks,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        run_id = %result.run_id,
        documents = result.documents,
        failures = result.failures,
        chunks = result.chunks,
        eval_items = result.eval_items,
        elapsed_ms = result.elapsed.as_millis(),
        "ingest pipeline complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Parse workers
// ---------------------------------------------------------------------------

/// Read-only state shared by every parse task.
struct ParseContext {
    gateway: Arc<RenderGateway>,
    layout: OutputLayout,
    version_tag: String,
    emit_ast: bool,
}

/// Parse every file on at most `workers` concurrent tasks.
///
/// Returns documents in completion order plus the number of failed files.
async fn parse_all(
    files: Vec<SourceFile>,
    context: Arc<ParseContext>,
    workers: usize,
    progress: &dyn ProgressReporter,
) -> (Vec<ManDoc>, usize) {
    let total = files.len();
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks: JoinSet<(PathBuf, Result<ManDoc>)> = JoinSet::new();

    debug!(workers, total, "spawning parse tasks");

    for source in files {
        let sem = Arc::clone(&semaphore);
        let ctx = Arc::clone(&context);
        tasks.spawn(async move {
            let path = source.path.clone();
            let Ok(_permit) = sem.acquire_owned().await else {
                return (path, Err(ManpagerError::validation("worker pool closed")));
            };
            let result = process_file(&source, &ctx).await;
            (path, result)
        });
    }

    let mut docs = Vec::with_capacity(total);
    let mut failures = 0;
    let mut completed = 0;

    while let Some(joined) = tasks.join_next().await {
        completed += 1;
        match joined {
            Ok((path, Ok(doc))) => {
                progress.file_processed(&path, true, completed, total);
                docs.push(doc);
            }
            Ok((path, Err(e))) => {
                warn!(path = %path.display(), error = %e, "failed to process man page");
                progress.file_processed(&path, false, completed, total);
                failures += 1;
            }
            Err(e) => {
                warn!(error = %e, "parse task aborted");
                progress.file_processed(Path::new("<aborted>"), false, completed, total);
                failures += 1;
            }
        }
    }

    info!(documents = docs.len(), failures, "parsing complete");
    (docs, failures)
}

/// Render, normalize, parse, build and write one source file.
async fn process_file(source: &SourceFile, ctx: &ParseContext) -> Result<ManDoc> {
    let rendered = ctx.gateway.render(&source.path).await?;
    let text = normalize(&rendered.text);
    let sections = parse_sections(&text);
    let doc = build_document(source, &sections, &ctx.version_tag)?;

    let ast = if ctx.emit_ast {
        ctx.gateway.render_ast(&source.path).await
    } else {
        None
    };

    write_document(&ctx.layout, &doc, &text, ast.as_deref());

    debug!(
        document_id = %doc.document_id,
        renderer = %rendered.renderer,
        "processed man page"
    );
    Ok(doc)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
