//! Core domain types for the man-page corpus.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ManpagerError;

/// Literal prefix of every document identifier.
pub const DOCUMENT_ID_PREFIX: &str = "man";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// Stable document identifier: `man:<version>:<page_name>:<section>`.
///
/// Derived purely from content, so two runs over the same input produce the
/// same identifiers regardless of processing order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId {
    version: String,
    page_name: String,
    section: String,
}

impl DocumentId {
    pub fn new(
        version: impl Into<String>,
        page_name: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            page_name: page_name.into(),
            section: section.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn page_name(&self) -> &str {
        &self.page_name
    }

    pub fn section(&self) -> &str {
        &self.section
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{DOCUMENT_ID_PREFIX}:{}:{}:{}",
            self.version, self.page_name, self.section
        )
    }
}

impl FromStr for DocumentId {
    type Err = ManpagerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [prefix, version, page_name, section] if *prefix == DOCUMENT_ID_PREFIX => {
                Ok(Self::new(*version, *page_name, *section))
            }
            _ => Err(ManpagerError::validation(format!(
                "malformed document id: {s}"
            ))),
        }
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ManpagerError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// ManDoc
// ---------------------------------------------------------------------------

/// One parsed section of a man page, with its offset in the document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    /// Upper-cased heading name (e.g. `SEE ALSO`).
    pub subsection_name: String,
    /// Section body as rendered and normalized.
    pub raw_text: String,
    /// Character offset within the concatenation of all section texts,
    /// each followed by a blank-line separator.
    pub start_offset: usize,
}

/// The structured record for one man page, written to `<name>.<section>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManDoc {
    pub document_id: DocumentId,
    pub version_tag: String,
    pub page_name: String,
    pub section: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// `name(section)` references, sorted and deduplicated.
    #[serde(default)]
    pub see_also: Vec<String>,
    pub source_path: String,
    /// First of COPYRIGHT / COLOPHON, truncated.
    #[serde(default)]
    pub license_text: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub name_raw: Option<String>,
    #[serde(default)]
    pub synopsis_raw: Option<String>,
    pub subsections: Vec<Subsection>,
}

impl ManDoc {
    /// Base file name (`<page_name>.<section>`) for per-document outputs.
    pub fn file_stem(&self) -> String {
        format!("{}.{}", self.page_name, self.section)
    }

    /// Whether the document has a subsection with the given (upper-case) name.
    pub fn has_subsection(&self, name: &str) -> bool {
        self.subsections
            .iter()
            .any(|s| s.subsection_name.to_uppercase() == name)
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A token-budgeted span of one section, written as one line of `chunks.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: DocumentId,
    pub section_name: String,
    /// `<page>-<section>-<slug>-<NN>`, unique within a document.
    pub anchor: String,
    pub text: String,
    pub token_count: usize,
    #[serde(default)]
    pub see_also_refs: Vec<String>,
    #[serde(default)]
    pub constants: Vec<String>,
}

// ---------------------------------------------------------------------------
// EvaluationItem
// ---------------------------------------------------------------------------

/// A synthetic retrieval query tied to a specific chunk anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationItem {
    pub query: String,
    pub expected_substrings: Vec<String>,
    pub document_id: DocumentId,
    pub target_section: String,
    pub target_anchor: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_display_and_parse() {
        let id = DocumentId::new("6.9", "getcwd", "3");
        let s = id.to_string();
        assert_eq!(s, "man:6.9:getcwd:3");

        let parts: Vec<&str> = s.split(':').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "man");

        let parsed: DocumentId = s.parse().expect("parse DocumentId");
        assert_eq!(parsed, id);
        assert_eq!(parsed.page_name(), "getcwd");
        assert_eq!(parsed.section(), "3");
        assert_eq!(parsed.version(), "6.9");
    }

    #[test]
    fn document_id_rejects_malformed() {
        assert!("doc:6.9:ls:1".parse::<DocumentId>().is_err());
        assert!("man:6.9:ls".parse::<DocumentId>().is_err());
        assert!("man:6.9:a:b:1".parse::<DocumentId>().is_err());
    }

    #[test]
    fn document_id_serializes_as_string() {
        let id = DocumentId::new("6.9", "ls", "1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"man:6.9:ls:1\"");
        let back: DocumentId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn chunk_serialization_shape() {
        let chunk = Chunk {
            document_id: DocumentId::new("6.9", "open", "2"),
            section_name: "ERRORS".into(),
            anchor: "open-2-errors-01".into(),
            text: "EACCES The requested access is not allowed.".into(),
            token_count: 7,
            see_also_refs: vec![],
            constants: vec!["EACCES".into()],
        };
        let value = serde_json::to_value(&chunk).expect("serialize");
        assert_eq!(value["document_id"], "man:6.9:open:2");
        assert_eq!(value["anchor"], "open-2-errors-01");
        assert_eq!(value["constants"][0], "EACCES");
    }

    #[test]
    fn mandoc_helpers() {
        let doc = ManDoc {
            document_id: DocumentId::new("6.9", "ls", "1"),
            version_tag: "6.9".into(),
            page_name: "ls".into(),
            section: "1".into(),
            title: None,
            aliases: vec![],
            see_also: vec![],
            source_path: "man1/ls.1".into(),
            license_text: None,
            created_at: Utc::now(),
            name_raw: None,
            synopsis_raw: None,
            subsections: vec![Subsection {
                subsection_name: "ERRORS".into(),
                raw_text: "none".into(),
                start_offset: 0,
            }],
        };
        assert_eq!(doc.file_stem(), "ls.1");
        assert!(doc.has_subsection("ERRORS"));
        assert!(!doc.has_subsection("NAME"));
    }
}
