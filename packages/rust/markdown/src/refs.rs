//! Cross-reference and constant extraction.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static SEE_ALSO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([a-zA-Z0-9_+.-]+)\((\d[a-z]?)\)").expect("valid regex")
});

static CONSTANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9_]{2,}\b").expect("valid regex"));

/// Upper-case words that look like constants but are ordinary prose.
const CONSTANT_STOPWORDS: &[&str] = &["THE", "AND", "FOR"];

/// Extract `name(section)` references, sorted and deduplicated.
pub fn extract_see_also_refs(text: &str) -> Vec<String> {
    SEE_ALSO_RE
        .captures_iter(text)
        .map(|caps| format!("{}({})", &caps[1], &caps[2]))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Extract upper-case identifiers (`EINVAL`, `O_RDONLY`), sorted and deduplicated.
pub fn extract_constants(text: &str) -> Vec<String> {
    CONSTANT_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|tok| !CONSTANT_STOPWORDS.contains(tok))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn see_also_refs_sorted_unique() {
        let refs = extract_see_also_refs("getcwd(3), realpath(3), chdir(2), getcwd(3)");
        assert_eq!(refs, vec!["chdir(2)", "getcwd(3)", "realpath(3)"]);
    }

    #[test]
    fn see_also_refs_with_suffix_sections() {
        let refs = extract_see_also_refs("pthread_create(3p) and c++filt(1) and ld.so(8)");
        assert_eq!(refs, vec!["c++filt(1)", "ld.so(8)", "pthread_create(3p)"]);
    }

    #[test]
    fn see_also_ignores_non_refs() {
        assert!(extract_see_also_refs("call f(x) or g()").is_empty());
    }

    #[test]
    fn constants_skip_stopwords() {
        let constants =
            extract_constants("THE call FOR EACH fd AND EINVAL, O_RDONLY or EINVAL again. OK");
        assert_eq!(constants, vec!["EACH", "EINVAL", "O_RDONLY"]);
    }
}
