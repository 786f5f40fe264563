//! Synthetic retrieval questions.
//!
//! Three question families are generated, each pointing at the anchor of the
//! chunk that should answer it: NAME lookups, SYNOPSIS lookups, and errno
//! meanings drawn from ERRORS chunks.

use std::collections::HashMap;
use std::sync::LazyLock;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use regex::Regex;
use tracing::debug;

use manpager_shared::{Chunk, DocumentId, EvalConfig, EvaluationItem, ManDoc};

static ERRNO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^E[A-Z0-9_]{2,}$").expect("valid regex"));

/// Longest expected substring taken from a section's first line.
const EXPECTED_MAX_CHARS: usize = 200;

/// Build the evaluation set for `docs` and their `chunks`.
///
/// Candidates are sorted before shuffling, so a fixed `config.seed` yields the
/// same set regardless of the order documents finished parsing in.
pub fn build_eval_set(
    docs: &[ManDoc],
    chunks: &[Chunk],
    config: &EvalConfig,
) -> Vec<EvaluationItem> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut index: SectionIndex<'_> = HashMap::new();
    for chunk in chunks {
        index
            .entry((chunk.document_id.to_string(), chunk.section_name.to_uppercase()))
            .or_default()
            .push(chunk);
    }

    let mut items: Vec<EvaluationItem> = Vec::new();

    for doc in docs {
        let Some(first) = section_chunks(&index, doc, "NAME").into_iter().next() else {
            continue;
        };
        let Some(line) = doc.name_raw.as_deref().and_then(first_line) else {
            continue;
        };
        items.push(EvaluationItem {
            query: format!("What is the NAME of {}({})?", doc.page_name, doc.section),
            expected_substrings: vec![line],
            document_id: doc.document_id.clone(),
            target_section: "NAME".into(),
            target_anchor: first.anchor.clone(),
        });
    }

    for doc in docs {
        let Some(first) = section_chunks(&index, doc, "SYNOPSIS").into_iter().next() else {
            continue;
        };
        let Some(line) = doc.synopsis_raw.as_deref().and_then(first_line) else {
            continue;
        };
        items.push(EvaluationItem {
            query: format!("Provide the SYNOPSIS for {}({}).", doc.page_name, doc.section),
            expected_substrings: vec![line],
            document_id: doc.document_id.clone(),
            target_section: "SYNOPSIS".into(),
            target_anchor: first.anchor.clone(),
        });
    }

    let mut errno_items: Vec<EvaluationItem> = Vec::new();
    for doc in docs {
        for chunk in section_chunks(&index, doc, "ERRORS") {
            for constant in chunk.constants.iter().filter(|c| ERRNO_RE.is_match(c)) {
                errno_items.push(EvaluationItem {
                    query: format!(
                        "In {}({}), what does {constant} mean?",
                        doc.page_name, doc.section
                    ),
                    expected_substrings: vec![constant.clone()],
                    document_id: doc.document_id.clone(),
                    target_section: "ERRORS".into(),
                    target_anchor: chunk.anchor.clone(),
                });
            }
        }
    }

    sort_items(&mut errno_items);
    errno_items.shuffle(&mut rng);

    let mut per_doc: HashMap<DocumentId, usize> = HashMap::new();
    errno_items.retain(|item| {
        let count = per_doc.entry(item.document_id.clone()).or_default();
        if *count >= config.errno_per_document {
            return false;
        }
        *count += 1;
        true
    });

    debug!(
        lookup_items = items.len(),
        errno_items = errno_items.len(),
        "eval candidates"
    );

    items.extend(errno_items);
    sort_items(&mut items);
    items.shuffle(&mut rng);
    items.truncate(config.max_items);
    items
}

/// Chunks keyed by (document id, upper-cased section name).
type SectionIndex<'c> = HashMap<(String, String), Vec<&'c Chunk>>;

fn section_chunks<'c>(index: &SectionIndex<'c>, doc: &ManDoc, section: &str) -> Vec<&'c Chunk> {
    index
        .get(&(doc.document_id.to_string(), section.to_string()))
        .cloned()
        .unwrap_or_default()
}

fn sort_items(items: &mut [EvaluationItem]) {
    items.sort_by(|a, b| {
        (&a.document_id, &a.target_anchor, &a.query).cmp(&(
            &b.document_id,
            &b.target_anchor,
            &b.query,
        ))
    });
}

/// First non-blank line, trimmed and cut to [`EXPECTED_MAX_CHARS`].
fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.chars().take(EXPECTED_MAX_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{chunk, doc};

    fn config(seed: u64) -> EvalConfig {
        EvalConfig {
            seed: Some(seed),
            ..EvalConfig::default()
        }
    }

    fn corpus() -> (Vec<ManDoc>, Vec<Chunk>) {
        let open = doc(
            "open",
            "2",
            &[
                ("NAME", "\n  open, openat - open a file  \nmore"),
                ("SYNOPSIS", "#include <fcntl.h>"),
                ("ERRORS", "EACCES ..."),
            ],
        );
        let ls = doc("ls", "1", &[("NAME", "ls - list"), ("SYNOPSIS", "")]);

        let mut errors = chunk(&open, "ERRORS", 1, 40);
        errors.constants = vec![
            "EACCES".into(),
            "EBADF".into(),
            "EEXIST".into(),
            "EINVAL".into(),
            "O_CREAT".into(),
        ];

        let chunks = vec![
            chunk(&open, "NAME", 1, 10),
            chunk(&open, "SYNOPSIS", 1, 10),
            errors,
            chunk(&ls, "NAME", 1, 5),
        ];
        (vec![open, ls], chunks)
    }

    #[test]
    fn generates_all_question_kinds() {
        let (docs, chunks) = corpus();
        let items = build_eval_set(&docs, &chunks, &config(1));

        let name_q = items
            .iter()
            .find(|i| i.query == "What is the NAME of open(2)?")
            .expect("NAME question");
        assert_eq!(name_q.expected_substrings, vec!["open, openat - open a file"]);
        assert_eq!(name_q.target_anchor, "open-2-name-01");

        let synopsis = items
            .iter()
            .find(|i| i.target_section == "SYNOPSIS")
            .expect("SYNOPSIS question");
        assert_eq!(synopsis.query, "Provide the SYNOPSIS for open(2).");
        assert_eq!(synopsis.expected_substrings, vec!["#include <fcntl.h>"]);

        // ls has an empty SYNOPSIS and no SYNOPSIS chunk.
        assert!(!items.iter().any(|i| i.query.contains("ls(1).")));

        let errno: Vec<_> = items.iter().filter(|i| i.target_section == "ERRORS").collect();
        assert_eq!(errno.len(), 3);
        for item in errno {
            assert!(item.query.starts_with("In open(2), what does E"));
            assert!(!item.expected_substrings[0].starts_with("O_"));
        }

        assert_eq!(items.len(), 2 + 1 + 3);
    }

    #[test]
    fn seeded_sets_are_reproducible() {
        let (docs, chunks) = corpus();
        let a = build_eval_set(&docs, &chunks, &config(42));

        let reversed: Vec<ManDoc> = docs.iter().rev().cloned().collect();
        let mut shuffled_chunks = chunks.clone();
        shuffled_chunks.reverse();
        let b = build_eval_set(&reversed, &shuffled_chunks, &config(42));

        assert_eq!(a, b);
    }

    #[test]
    fn respects_max_items() {
        let (docs, chunks) = corpus();
        let cfg = EvalConfig {
            max_items: 2,
            seed: Some(3),
            ..EvalConfig::default()
        };
        assert_eq!(build_eval_set(&docs, &chunks, &cfg).len(), 2);
    }

    #[test]
    fn expected_substring_is_truncated() {
        let long = "x".repeat(500);
        assert_eq!(first_line(&long).unwrap().chars().count(), EXPECTED_MAX_CHARS);
        assert_eq!(first_line("\n \n"), None);
    }
}
