//! Corpus quality report.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use manpager_shared::{Chunk, DocumentId, ManDoc, RunId};

use crate::hints::canonical_section;

/// Number of documents listed in `sections_present_per_doc_sample`.
const SECTION_SAMPLE_SIZE: usize = 50;

/// Length of the `top_*` frequency lists.
const TOP_N: usize = 50;

/// Cap on example anchors listed per finding.
const MAX_EXAMPLES: usize = 20;

/// `report.json`.
///
/// Statistic blocks are absent when no chunks were produced; `note` says so.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub run_id: RunId,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub total_documents: usize,
    pub total_chunks: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_by_section_name: Option<BTreeMap<String, usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_by_document: Option<ChunksPerDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oversized_chunks: Option<OversizedChunks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_anchors: Option<DuplicateAnchors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections_present_per_doc_sample: Option<BTreeMap<DocumentId, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_constants: Option<Vec<(String, usize)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_see_also_refs: Option<Vec<(String, usize)>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenStats {
    pub total: usize,
    pub avg: f64,
    pub min: usize,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunksPerDocument {
    pub min: usize,
    pub avg: f64,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OversizedChunks {
    pub count: usize,
    pub max_allowed_tokens: usize,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateAnchors {
    pub count: usize,
    pub examples: Vec<String>,
}

/// Linear-interpolation percentile over ascending `sorted` values.
///
/// Equal neighbours return the value itself, so a constant series yields
/// that constant exactly.
pub fn percentile(sorted: &[usize], p: f64) -> f64 {
    let Some((&first, &last)) = sorted.first().zip(sorted.last()) else {
        return 0.0;
    };
    if p <= 0.0 {
        return first as f64;
    }
    if p >= 100.0 {
        return last as f64;
    }

    let k = (sorted.len() - 1) as f64 * (p / 100.0);
    let f = k.floor() as usize;
    let c = (f + 1).min(sorted.len() - 1);
    if f == c || sorted[f] == sorted[c] {
        return sorted[f] as f64;
    }

    sorted[f] as f64 * (c as f64 - k) + sorted[c] as f64 * (k - f as f64)
}

/// Build the quality report for a finished run.
pub fn build_quality_report(
    run_id: &RunId,
    version: &str,
    docs: &[ManDoc],
    chunks: &[Chunk],
    max_tokens: usize,
) -> QualityReport {
    let mut report = QualityReport {
        run_id: run_id.clone(),
        version: version.to_string(),
        generated_at: Utc::now(),
        total_documents: docs.len(),
        total_chunks: chunks.len(),
        note: None,
        tokens: None,
        chunks_by_section_name: None,
        chunks_by_document: None,
        oversized_chunks: None,
        duplicate_anchors: None,
        sections_present_per_doc_sample: None,
        top_constants: None,
        top_see_also_refs: None,
    };

    if chunks.is_empty() {
        report.note = Some("No chunks generated.".into());
        return report;
    }

    let mut counts: Vec<usize> = chunks.iter().map(|c| c.token_count).collect();
    counts.sort_unstable();
    let total: usize = counts.iter().sum();
    report.tokens = Some(TokenStats {
        total,
        avg: total as f64 / counts.len() as f64,
        min: counts[0],
        p50: percentile(&counts, 50.0),
        p90: percentile(&counts, 90.0),
        p95: percentile(&counts, 95.0),
        max: counts[counts.len() - 1],
    });

    let mut by_section: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_document: HashMap<&DocumentId, usize> = HashMap::new();
    let mut by_anchor: HashMap<&str, usize> = HashMap::new();
    let mut constants: HashMap<&str, usize> = HashMap::new();
    let mut see_also: HashMap<&str, usize> = HashMap::new();

    for chunk in chunks {
        let section = canonical_section(&chunk.section_name)
            .map(str::to_string)
            .unwrap_or_else(|| chunk.section_name.trim().to_uppercase());
        *by_section.entry(section).or_default() += 1;
        *by_document.entry(&chunk.document_id).or_default() += 1;
        *by_anchor.entry(chunk.anchor.as_str()).or_default() += 1;
        for c in &chunk.constants {
            *constants.entry(c.as_str()).or_default() += 1;
        }
        for r in &chunk.see_also_refs {
            *see_also.entry(r.as_str()).or_default() += 1;
        }
    }
    report.chunks_by_section_name = Some(by_section);

    let per_doc: Vec<usize> = by_document.values().copied().collect();
    report.chunks_by_document = Some(ChunksPerDocument {
        min: per_doc.iter().copied().min().unwrap_or(0),
        avg: per_doc.iter().sum::<usize>() as f64 / per_doc.len() as f64,
        max: per_doc.iter().copied().max().unwrap_or(0),
    });

    let oversized: Vec<String> = chunks
        .iter()
        .filter(|c| c.token_count > max_tokens)
        .map(|c| c.anchor.clone())
        .collect();
    report.oversized_chunks = Some(OversizedChunks {
        count: oversized.len(),
        max_allowed_tokens: max_tokens,
        examples: oversized.into_iter().take(MAX_EXAMPLES).collect(),
    });

    let mut duplicates: Vec<String> = by_anchor
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(a, _)| a.to_string())
        .collect();
    duplicates.sort();
    report.duplicate_anchors = Some(DuplicateAnchors {
        count: duplicates.len(),
        examples: duplicates.into_iter().take(MAX_EXAMPLES).collect(),
    });

    report.sections_present_per_doc_sample = Some(
        docs.iter()
            .take(SECTION_SAMPLE_SIZE)
            .map(|d| {
                let mut names: Vec<String> = d
                    .subsections
                    .iter()
                    .map(|s| s.subsection_name.to_uppercase())
                    .filter(|n| !n.is_empty())
                    .collect();
                names.sort();
                names.dedup();
                (d.document_id.clone(), names)
            })
            .collect(),
    );

    report.top_constants = Some(top_n(constants));
    report.top_see_also_refs = Some(top_n(see_also));

    report
}

/// Most frequent values, ties broken alphabetically.
fn top_n(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut pairs: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(value, n)| (value.to_string(), n))
        .collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs.truncate(TOP_N);
    pairs
}
