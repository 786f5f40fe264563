//! Alias → canonical page map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use manpager_shared::{DocumentId, ManDoc};

/// Where an alias points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub canonical: String,
    pub section: String,
    pub document_id: DocumentId,
}

/// Map every alias of every document to its canonical page.
///
/// When two documents claim the same alias, the later document wins.
pub fn build_alias_map(docs: &[ManDoc]) -> BTreeMap<String, AliasEntry> {
    let mut map: BTreeMap<String, AliasEntry> = BTreeMap::new();

    for doc in docs {
        for alias in &doc.aliases {
            let key = alias.trim();
            if key.is_empty() {
                continue;
            }

            let entry = AliasEntry {
                canonical: doc.page_name.clone(),
                section: doc.section.clone(),
                document_id: doc.document_id.clone(),
            };
            if let Some(previous) = map.insert(key.to_string(), entry) {
                debug!(alias = key, previous = %previous.document_id, "alias reassigned");
            }
        }
    }

    map
}
