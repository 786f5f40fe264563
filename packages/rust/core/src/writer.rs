//! Output writer.
//!
//! Owns the on-disk layout under the data directory, writes per-document
//! files as they are parsed, and writes the run-level assets and manifest
//! once the corpus is complete.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use manpager_artifacts::{
    DocumentIndexRecord, DocumentSummary, build_alias_map, build_eval_set, build_quality_report,
    build_section_hints,
};
use manpager_shared::{AppConfig, Chunk, ManDoc, ManpagerError, Result, RunId};

/// Name of the file recording where a source archive was extracted.
pub const EXTRACTED_ROOT_MARKER: &str = ".extracted_root";

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Paths of everything the pipeline writes under the data directory.
///
/// ```text
/// <data_dir>/
/// ├── manifest.json
/// ├── raw/manpages-<version>/.extracted_root
/// ├── parsed/
/// │   ├── json/   <name>.<section>.json, .ast.json, aliases.json,
/// │   │           section_hints.json, documents.index.jsonl,
/// │   │           documents.summary.json
/// │   └── text/   <name>.<section>.md
/// ├── chunks/chunks.jsonl
/// └── eval/       eval.jsonl, report.json
/// ```
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn parsed_json_dir(&self) -> PathBuf {
        self.root.join("parsed").join("json")
    }

    pub fn parsed_text_dir(&self) -> PathBuf {
        self.root.join("parsed").join("text")
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join("chunks")
    }

    pub fn eval_dir(&self) -> PathBuf {
        self.root.join("eval")
    }

    /// Raw source directory for one man-pages release.
    pub fn raw_dir(&self, version_tag: &str) -> PathBuf {
        self.root.join("raw").join(format!("manpages-{version_tag}"))
    }

    pub fn extracted_root_marker(&self, version_tag: &str) -> PathBuf {
        self.raw_dir(version_tag).join(EXTRACTED_ROOT_MARKER)
    }

    pub fn chunks_path(&self) -> PathBuf {
        self.chunks_dir().join("chunks.jsonl")
    }

    pub fn eval_set_path(&self) -> PathBuf {
        self.eval_dir().join("eval.jsonl")
    }

    pub fn quality_report_path(&self) -> PathBuf {
        self.eval_dir().join("report.json")
    }

    pub fn aliases_path(&self) -> PathBuf {
        self.parsed_json_dir().join("aliases.json")
    }

    pub fn section_hints_path(&self) -> PathBuf {
        self.parsed_json_dir().join("section_hints.json")
    }

    pub fn document_index_path(&self) -> PathBuf {
        self.parsed_json_dir().join("documents.index.jsonl")
    }

    pub fn document_summary_path(&self) -> PathBuf {
        self.parsed_json_dir().join("documents.summary.json")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    /// Create every output directory.
    pub fn create_dirs(&self) -> Result<()> {
        let dirs = [
            self.parsed_json_dir(),
            self.parsed_text_dir(),
            self.chunks_dir(),
            self.eval_dir(),
        ];

        for dir in &dirs {
            std::fs::create_dir_all(dir).map_err(|e| ManpagerError::io(dir, e))?;
        }

        debug!(path = %self.root.display(), "output directories created");
        Ok(())
    }

    /// Path relative to the data directory, for the manifest.
    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

// ---------------------------------------------------------------------------
// Atomic writes
// ---------------------------------------------------------------------------

/// Checksum and size of one written artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Write `content` to `path` through a temp file in the same directory,
/// then rename it into place.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(".{name}.{}.tmp", uuid::Uuid::now_v7()));

    std::fs::write(&temp, content).map_err(|e| ManpagerError::io(&temp, e))?;
    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(ManpagerError::io(path, e));
    }
    Ok(())
}

fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

fn to_json_pretty<T: Serialize + ?Sized>(data: &T) -> Result<Vec<u8>> {
    let mut json = serde_json::to_vec_pretty(data)?;
    json.push(b'\n');
    Ok(json)
}

fn to_json_lines<'a, T, I>(items: I) -> Result<Vec<u8>>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out = Vec::new();
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Writes run-level artifacts and records their checksums.
#[derive(Debug)]
pub struct ArtifactWriter<'a> {
    layout: &'a OutputLayout,
    written: Vec<ArtifactMeta>,
}

impl<'a> ArtifactWriter<'a> {
    pub fn new(layout: &'a OutputLayout) -> Self {
        Self {
            layout,
            written: Vec::new(),
        }
    }

    /// Write a pretty-printed JSON file.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, path: &Path, data: &T) -> Result<()> {
        let content = to_json_pretty(data)?;
        self.write_bytes(path, &content)
    }

    /// Write one compact JSON object per line.
    pub fn write_jsonl<'i, T, I>(&mut self, path: &Path, items: I) -> Result<()>
    where
        T: Serialize + 'i,
        I: IntoIterator<Item = &'i T>,
    {
        let content = to_json_lines(items)?;
        self.write_bytes(path, &content)
    }

    fn write_bytes(&mut self, path: &Path, content: &[u8]) -> Result<()> {
        write_atomic(path, content)?;
        let meta = ArtifactMeta {
            filename: self.layout.relative(path),
            sha256: sha256_hex(content),
            size_bytes: content.len(),
        };
        debug!(file = %meta.filename, size = meta.size_bytes, "wrote artifact");
        self.written.push(meta);
        Ok(())
    }

    /// Artifacts written so far, in write order.
    pub fn artifacts(&self) -> &[ArtifactMeta] {
        &self.written
    }

    pub fn into_artifacts(self) -> Vec<ArtifactMeta> {
        self.written
    }
}

// ---------------------------------------------------------------------------
// Per-document output
// ---------------------------------------------------------------------------

/// Write `<stem>.json`, `<stem>.md`, and optionally `<stem>.ast.json` for one
/// parsed document.
///
/// Each file is attempted independently. A failed write is logged and never
/// removes the document from the corpus.
pub fn write_document(layout: &OutputLayout, doc: &ManDoc, text: &str, ast: Option<&str>) {
    let stem = doc.file_stem();

    let json_path = layout.parsed_json_dir().join(format!("{stem}.json"));
    warn_on_error(
        &format!("{stem}.json"),
        to_json_pretty(doc).and_then(|bytes| write_atomic(&json_path, &bytes)),
    );

    let text_path = layout.parsed_text_dir().join(format!("{stem}.md"));
    warn_on_error(&format!("{stem}.md"), write_atomic(&text_path, text.as_bytes()));

    if let Some(ast) = ast {
        let ast_path = layout.parsed_json_dir().join(format!("{stem}.ast.json"));
        warn_on_error(&format!("{stem}.ast.json"), write_atomic(&ast_path, ast.as_bytes()));
    }

    debug!(document_id = %doc.document_id, "wrote document");
}

// ---------------------------------------------------------------------------
// Run-level assets
// ---------------------------------------------------------------------------

/// What [`write_corpus_assets`] produced.
#[derive(Debug, Clone, Default)]
pub struct CorpusAssets {
    pub artifacts: Vec<ArtifactMeta>,
    pub eval_items: usize,
    pub oversized_chunks: usize,
}

/// Write the chunk corpus and every derived asset.
///
/// Each file is attempted independently; a failed write is logged and the
/// remaining assets are still written.
#[instrument(skip_all, fields(documents = docs.len(), chunks = chunks.len()))]
pub fn write_corpus_assets(
    layout: &OutputLayout,
    run_id: &RunId,
    docs: &[ManDoc],
    chunks: &[Chunk],
    config: &AppConfig,
) -> CorpusAssets {
    let version = config.defaults.version_tag.as_str();
    let mut writer = ArtifactWriter::new(layout);

    let index: Vec<DocumentIndexRecord> = docs.iter().map(DocumentIndexRecord::from).collect();
    warn_on_error(
        "document index",
        writer.write_jsonl(&layout.document_index_path(), &index),
    );
    warn_on_error(
        "document summary",
        writer.write_json(
            &layout.document_summary_path(),
            &DocumentSummary::build(run_id, version, docs),
        ),
    );
    warn_on_error(
        "alias map",
        writer.write_json(&layout.aliases_path(), &build_alias_map(docs)),
    );
    warn_on_error(
        "section hints",
        writer.write_json(&layout.section_hints_path(), &build_section_hints()),
    );
    warn_on_error("chunks", writer.write_jsonl(&layout.chunks_path(), chunks));

    let eval_set = build_eval_set(docs, chunks, &config.eval);
    warn_on_error(
        "evaluation set",
        writer.write_jsonl(&layout.eval_set_path(), &eval_set),
    );

    let report = build_quality_report(
        run_id,
        version,
        docs,
        chunks,
        config.chunking.max_tokens,
    );
    warn_on_error(
        "quality report",
        writer.write_json(&layout.quality_report_path(), &report),
    );

    let oversized_chunks = report.oversized_chunks.map(|o| o.count).unwrap_or(0);
    info!(
        artifacts = writer.artifacts().len(),
        eval_items = eval_set.len(),
        oversized_chunks,
        "corpus assets written"
    );

    CorpusAssets {
        artifacts: writer.into_artifacts(),
        eval_items: eval_set.len(),
        oversized_chunks,
    }
}

fn warn_on_error(asset: &str, result: Result<()>) {
    if let Err(e) = result {
        warn!(asset, error = %e, "failed to write asset");
    }
}

// ---------------------------------------------------------------------------
// Run manifest
// ---------------------------------------------------------------------------

/// `manifest.json`: one record per pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub tool_version: String,
    pub version_tag: String,
    pub source_root: String,
    pub renderers: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub documents: usize,
    pub failures: usize,
    pub chunks: usize,
    pub eval_items: usize,
    pub artifacts: Vec<ArtifactMeta>,
}

/// Write the run manifest atomically.
pub fn write_manifest(layout: &OutputLayout, manifest: &RunManifest) -> Result<()> {
    let path = layout.manifest_path();
    write_atomic(&path, &to_json_pretty(manifest)?)?;
    debug!(path = %path.display(), "wrote run manifest");
    Ok(())
}

/// Read a run manifest back from disk.
pub fn read_manifest(layout: &OutputLayout) -> Result<RunManifest> {
    let path = layout.manifest_path();
    let content = std::fs::read_to_string(&path).map_err(|e| ManpagerError::io(&path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| ManpagerError::validation(format!("invalid manifest.json: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
