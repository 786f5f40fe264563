//! Man-page source discovery.
//!
//! Walks a source tree laid out as `man<digit><letter?>/` directories and
//! returns every man-page source file in a deterministic order, each tagged
//! with its detected section number.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use manpager_shared::{ManpagerError, Result};

/// Section assigned when neither the file name nor the directory names one.
pub const UNKNOWN_SECTION: &str = "0";

/// Matches a section suffix on a file name, e.g. `.3` or `.3p`.
static SUFFIX_SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(\d[a-z]?)$").expect("suffix section regex"));

/// Matches a section directory name, e.g. `man3` or `man3p`.
static DIR_SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^man(\d[a-z]?)$").expect("dir section regex"));

/// Matches a directory that may hold sources (`man[1-9]*`).
static MAN_DIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^man[1-9]").expect("man dir regex"));

/// Matches a source file name (`*.[1-9]` or `*.[1-9][a-z]`).
static SOURCE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[1-9][a-z]?$").expect("source name regex"));

// ---------------------------------------------------------------------------
// SourceFile
// ---------------------------------------------------------------------------

/// One man-page source file, discovered once per run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    /// Path to the troff/man source.
    pub path: PathBuf,
    /// Detected section number (e.g. `3`, `3p`, or `0` if unknown).
    pub section: String,
}

impl SourceFile {
    /// Build a source file record, detecting its section from the path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let section = detect_section(&path).unwrap_or_else(|| UNKNOWN_SECTION.to_string());
        Self { path, section }
    }

    /// The file name, or an empty string for paths without one.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Detect the section number from the file suffix, then the parent directory.
pub fn detect_section(path: &Path) -> Option<String> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if let Some(caps) = SUFFIX_SECTION_RE.captures(name) {
        return Some(caps[1].to_string());
    }

    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    DIR_SECTION_RE.captures(parent).map(|caps| caps[1].to_string())
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Discover man-page sources under `root`.
///
/// A file qualifies when one of its ancestor directories below `root` is named
/// `man[1-9]*` and its name ends in a section suffix. Hidden files are skipped.
/// Results are sorted by (suffix, lowercased path) and truncated to `limit`.
#[instrument(skip_all, fields(root = %root.display(), limit = ?limit))]
pub fn discover_man_files(root: &Path, limit: Option<usize>) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        return Err(ManpagerError::config(format!(
            "source root is not a directory: {}",
            root.display()
        )));
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_source_file(root, path) {
            continue;
        }

        if seen.insert(path.to_path_buf()) {
            files.push(path.to_path_buf());
        }
    }

    files.sort_by_cached_key(|p| (suffix_of(p), p.to_string_lossy().to_lowercase()));

    if let Some(limit) = limit {
        files.truncate(limit);
    }

    info!(count = files.len(), "discovered man sources");

    Ok(files.into_iter().map(SourceFile::new).collect())
}

/// Check the name and ancestor-directory rules for one candidate file.
fn is_source_file(root: &Path, path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    if name.starts_with('.') || !SOURCE_NAME_RE.is_match(name) {
        return false;
    }

    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };

    let in_man_dir = relative
        .parent()
        .map(|dir| {
            dir.components().any(|c| {
                c.as_os_str()
                    .to_str()
                    .is_some_and(|s| MAN_DIR_RE.is_match(s))
            })
        })
        .unwrap_or(false);

    if !in_man_dir {
        debug!(path = %path.display(), "not under a man[1-9]* directory");
    }
    in_man_dir
}

/// File extension including the dot (`.3`), or empty.
fn suffix_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}
