//! Heading-delimited section parsing.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}#{1,6}\s+([^\n#].*?)\s*$").expect("valid regex"));

/// Ordered heading → body map.
///
/// Keys are upper-cased headings in first-seen order. Inserting an existing
/// key replaces its body but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    entries: Vec<(String, String)>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a section in place.
    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<String>) {
        let name = name.into();
        let body = body.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => {
                debug!(section = %name, "duplicate heading, overwriting");
                *existing = body;
            }
            None => self.entries.push((name, body)),
        }
    }

    /// Body of a section by its upper-cased name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First non-blank body among `names`, in the order given.
    pub fn first_non_empty(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .find(|body| !body.trim().is_empty())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split normalized text into sections at `#`-style headings.
///
/// Text before the first heading is dropped. Each body is the lines up to the
/// next heading, joined and trimmed.
pub fn parse_sections(text: &str) -> SectionMap {
    let mut sections = SectionMap::new();
    let mut current: Option<String> = None;
    let mut buf: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = HEADING_RE.captures(line) {
            if let Some(name) = current.take() {
                sections.insert(name, buf.join("\n").trim());
            }
            buf.clear();
            current = Some(caps[1].trim().to_uppercase());
            continue;
        }
        buf.push(line);
    }

    if let Some(name) = current {
        sections.insert(name, buf.join("\n").trim());
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headings_in_order() {
        let text = "preamble is dropped\n# NAME\nls - list\n\n## Synopsis\n`ls [OPTION]...`\n# description\nList info.\n";
        let sections = parse_sections(text);

        let names: Vec<&str> = sections.names().collect();
        assert_eq!(names, vec!["NAME", "SYNOPSIS", "DESCRIPTION"]);
        assert_eq!(sections.get("NAME"), Some("ls - list"));
        assert_eq!(sections.get("SYNOPSIS"), Some("`ls [OPTION]...`"));
        assert_eq!(sections.get("DESCRIPTION"), Some("List info."));
    }

    #[test]
    fn heading_rules() {
        let text = "   ### Return Value   \nzero\n    # not a heading\n####### too deep\n#nospace\n";
        let sections = parse_sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections.get("RETURN VALUE"),
            Some("zero\n    # not a heading\n####### too deep\n#nospace")
        );
    }

    #[test]
    fn duplicate_heading_overwrites_in_place() {
        let text = "# NAME\nfirst\n# NOTES\nnote\n# NAME\nsecond\n";
        let sections = parse_sections(text);

        let pairs: Vec<(&str, &str)> = sections.iter().collect();
        assert_eq!(pairs, vec![("NAME", "second"), ("NOTES", "note")]);
    }

    #[test]
    fn no_headings_is_empty() {
        assert!(parse_sections("just some text\nmore").is_empty());
    }

    #[test]
    fn first_non_empty_skips_blank() {
        let sections = parse_sections("# COPYRIGHT\n\n# COLOPHON\nThis page is part of...\n");
        assert_eq!(
            sections.first_non_empty(&["COPYRIGHT", "COLOPHON"]),
            Some("This page is part of...")
        );
        assert_eq!(sections.first_non_empty(&["LICENSE"]), None);
    }
}
