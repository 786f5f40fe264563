//! Document index and corpus summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use manpager_shared::{DocumentId, ManDoc, RunId};

/// One line of `documents.index.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIndexRecord {
    pub document_id: DocumentId,
    pub version_tag: String,
    pub page_name: String,
    pub section: String,
    pub title: Option<String>,
    pub aliases: Vec<String>,
    pub see_also: Vec<String>,
    pub source_path: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ManDoc> for DocumentIndexRecord {
    fn from(doc: &ManDoc) -> Self {
        Self {
            document_id: doc.document_id.clone(),
            version_tag: doc.version_tag.clone(),
            page_name: doc.page_name.clone(),
            section: doc.section.clone(),
            title: doc.title.clone(),
            aliases: doc.aliases.clone(),
            see_also: doc.see_also.clone(),
            source_path: doc.source_path.clone(),
            created_at: doc.created_at,
        }
    }
}

/// `documents.summary.json`: corpus-level counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub run_id: RunId,
    pub version: String,
    pub total_documents: usize,
    pub documents_by_section: BTreeMap<String, usize>,
    #[serde(rename = "with_NAME")]
    pub with_name: usize,
    #[serde(rename = "with_SYNOPSIS")]
    pub with_synopsis: usize,
    #[serde(rename = "with_ERRORS")]
    pub with_errors: usize,
    pub generated_at: DateTime<Utc>,
}

impl DocumentSummary {
    pub fn build(run_id: &RunId, version: &str, docs: &[ManDoc]) -> Self {
        let mut documents_by_section: BTreeMap<String, usize> = BTreeMap::new();
        for doc in docs {
            *documents_by_section.entry(doc.section.clone()).or_default() += 1;
        }

        Self {
            run_id: run_id.clone(),
            version: version.to_string(),
            total_documents: docs.len(),
            documents_by_section,
            with_name: docs.iter().filter(|d| d.name_raw.is_some()).count(),
            with_synopsis: docs.iter().filter(|d| d.synopsis_raw.is_some()).count(),
            with_errors: docs.iter().filter(|d| d.has_subsection("ERRORS")).count(),
            generated_at: Utc::now(),
        }
    }
}
