//! Whitespace normalization for rendered man pages.
//!
//! Each pass is a function `&str -> String` applied in sequence. Prose lines
//! are trimmed and collapsed; fenced and indented code keeps its layout.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full normalization pipeline on rendered text.
pub fn normalize(text: &str) -> String {
    let mut result = normalize_line_endings(text);

    result = normalize_lines(&result);
    result = collapse_blank_runs(&result);

    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: Line endings
// ---------------------------------------------------------------------------

/// Convert CRLF and lone CR line endings to LF.
fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Per-line whitespace
// ---------------------------------------------------------------------------

/// Trim prose lines and collapse internal whitespace; right-trim code lines.
fn normalize_lines(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        if line.starts_with("```") {
            in_fence = !in_fence;
            lines.push(line.trim_end().to_string());
            continue;
        }

        if in_fence || line.starts_with("    ") {
            lines.push(line.trim_end().to_string());
            continue;
        }

        lines.push(line.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 2+ blank lines into exactly one.
fn collapse_blank_runs(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n").to_string()
}
