//! Static section-name hints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Section headings commonly found in man pages.
pub const RECOGNIZED_SECTIONS: &[&str] = &[
    "NAME",
    "SYNOPSIS",
    "DESCRIPTION",
    "OPTIONS",
    "RETURN VALUE",
    "ERRORS",
    "NOTES",
    "EXAMPLES",
    "SEE ALSO",
    "CONFORMING TO",
    "STANDARDS",
    "BUGS",
    "ENVIRONMENT",
    "FILES",
    "VERSIONS",
    "ATTRIBUTES",
    "COLOPHON",
    "CAVEATS",
    "DIAGNOSTICS",
    "HISTORY",
    "COMPATIBILITY",
    "AVAILABILITY",
    "AUTHOR",
    "COPYRIGHT",
    "EXIT STATUS",
];

/// Canonical heading → alternate headings with the same meaning.
pub const SECTION_SYNONYMS: &[(&str, &[&str])] = &[
    ("NAME", &["TITLE"]),
    ("SYNOPSIS", &["USAGE", "INTERFACE", "PROTOTYPE"]),
    ("DESCRIPTION", &["DETAILS", "OVERVIEW"]),
    ("OPTIONS", &["ARGUMENTS", "FLAGS", "PARAMETERS"]),
    ("RETURN VALUE", &["RETURNS"]),
    ("ERRORS", &["DIAGNOSTICS", "ERRNO"]),
    ("NOTES", &["NOTE"]),
    ("EXAMPLES", &["EXAMPLE"]),
    ("SEE ALSO", &["SEEALSO", "RELATED"]),
    ("STANDARDS", &["CONFORMING TO", "CONFORMANCE"]),
    ("BUGS", &["LIMITATIONS", "ISSUES"]),
    ("ENVIRONMENT", &["ENV", "ENV VARS", "ENVIRONMENT VARIABLES"]),
    ("FILES", &["FILE"]),
    ("VERSIONS", &["VERSION", "HISTORY"]),
    ("ATTRIBUTES", &[]),
    ("COLOPHON", &[]),
    ("CAVEATS", &[]),
    ("DIAGNOSTICS", &[]),
    ("HISTORY", &[]),
    ("COMPATIBILITY", &[]),
    ("AVAILABILITY", &[]),
    ("AUTHOR", &["AUTHORS", "MAINTAINER"]),
    ("COPYRIGHT", &["LICENSE"]),
    ("EXIT STATUS", &["EXITSTATUS"]),
];

/// `section_hints.json`: the synonym table, its inverse, and the recognized
/// headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHints {
    pub recognized_sections: Vec<String>,
    pub canonical_to_synonyms: BTreeMap<String, Vec<String>>,
    pub synonym_to_canonical: BTreeMap<String, String>,
}

pub fn build_section_hints() -> SectionHints {
    let mut canonical_to_synonyms = BTreeMap::new();
    let mut synonym_to_canonical = BTreeMap::new();

    for (canonical, synonyms) in SECTION_SYNONYMS {
        canonical_to_synonyms.insert(
            canonical.to_string(),
            synonyms.iter().map(|s| s.to_string()).collect(),
        );
        for synonym in *synonyms {
            synonym_to_canonical.insert(synonym.to_string(), canonical.to_string());
        }
    }

    SectionHints {
        recognized_sections: RECOGNIZED_SECTIONS.iter().map(|s| s.to_string()).collect(),
        canonical_to_synonyms,
        synonym_to_canonical,
    }
}

/// Canonical name for a heading: itself if canonical, else the synonym's target.
///
/// Canonical names take precedence, so `DIAGNOSTICS` stays `DIAGNOSTICS`.
pub fn canonical_section(heading: &str) -> Option<&'static str> {
    let heading = heading.trim().to_uppercase();

    if let Some((canonical, _)) = SECTION_SYNONYMS.iter().find(|(c, _)| *c == heading) {
        return Some(*canonical);
    }
    SECTION_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|s| *s == heading))
        .map(|(canonical, _)| *canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_include_inverse() {
        let hints = build_section_hints();
        assert_eq!(hints.canonical_to_synonyms.len(), SECTION_SYNONYMS.len());
        assert_eq!(hints.canonical_to_synonyms["ERRORS"], vec!["DIAGNOSTICS", "ERRNO"]);
        assert!(hints.canonical_to_synonyms["CAVEATS"].is_empty());
        assert_eq!(hints.synonym_to_canonical["RETURNS"], "RETURN VALUE");
        assert_eq!(hints.synonym_to_canonical["ENV VARS"], "ENVIRONMENT");
        assert!(!hints.synonym_to_canonical.contains_key("NAME"));
        assert_eq!(hints.recognized_sections.len(), RECOGNIZED_SECTIONS.len());
        assert_eq!(hints.recognized_sections[0], "NAME");
    }

    #[test]
    fn every_canonical_is_recognized() {
        for (canonical, _) in SECTION_SYNONYMS {
            assert!(RECOGNIZED_SECTIONS.contains(canonical), "{canonical}");
        }
    }

    #[test]
    fn canonical_section_lookup() {
        assert_eq!(canonical_section("Returns"), Some("RETURN VALUE"));
        assert_eq!(canonical_section("SEE ALSO"), Some("SEE ALSO"));
        assert_eq!(canonical_section("DIAGNOSTICS"), Some("DIAGNOSTICS"));
        assert_eq!(canonical_section("conforming to"), Some("STANDARDS"));
        assert_eq!(canonical_section("MISC"), None);
    }
}
