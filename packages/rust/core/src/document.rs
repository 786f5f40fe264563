//! Document builder: parsed sections → [`ManDoc`].

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tracing::debug;

use manpager_discovery::SourceFile;
use manpager_markdown::{SectionMap, extract_see_also_refs};
use manpager_shared::{DocumentId, ManDoc, ManpagerError, Result, Subsection};

/// Maximum length of the license excerpt, in characters.
pub const LICENSE_MAX_CHARS: usize = 2000;

/// Separator that follows every section when computing offsets.
const OFFSET_SEPARATOR_CHARS: usize = 2;

/// Sections searched, in order, for the license excerpt.
const LICENSE_SECTIONS: &[&str] = &["COPYRIGHT", "COLOPHON"];

static NAME_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[-—–]\s+").expect("valid regex"));

static ALIAS_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*").expect("valid regex"));

static UNSAFE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/\\:*?"<>|]"#).expect("valid regex"));

/// Names and title parsed from the first line of a NAME section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameLine {
    pub canonical: Option<String>,
    pub title: Option<String>,
    pub aliases: Vec<String>,
}

/// Parse `name1, name2 — title` from the first non-blank line of `text`.
pub fn parse_name_line(text: &str) -> NameLine {
    let Some(line) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return NameLine::default();
    };

    let mut parts = NAME_SPLIT_RE.splitn(line, 2);
    let left = parts.next().unwrap_or_default().trim();
    let title = parts.next().map(|t| t.trim().to_string());

    let mut names = ALIAS_SPLIT_RE
        .split(left)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    NameLine {
        canonical: names.next(),
        title,
        aliases: names.collect(),
    }
}

/// Make a page name safe for file names and document ids.
pub fn sanitize_page_name(name: &str) -> String {
    UNSAFE_NAME_RE
        .replace_all(name, "_")
        .trim_matches('_')
        .to_string()
}

/// Build the structured document for one parsed source file.
pub fn build_document(
    source: &SourceFile,
    sections: &SectionMap,
    version_tag: &str,
) -> Result<ManDoc> {
    let name_text = sections.get("NAME").unwrap_or_default();
    let name_line = parse_name_line(name_text);

    let page_name = name_line
        .canonical
        .as_deref()
        .map(sanitize_page_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback_page_name(source));
    if page_name.is_empty() {
        return Err(ManpagerError::parse(format!(
            "no page name for {}",
            source.path.display()
        )));
    }

    let see_also = extract_see_also_refs(sections.get("SEE ALSO").unwrap_or_default());

    let license_text = sections
        .first_non_empty(LICENSE_SECTIONS)
        .map(|t| t.chars().take(LICENSE_MAX_CHARS).collect::<String>());

    let mut offset = 0;
    let subsections: Vec<Subsection> = sections
        .iter()
        .map(|(name, text)| {
            let sub = Subsection {
                subsection_name: name.to_string(),
                raw_text: text.to_string(),
                start_offset: offset,
            };
            offset += text.chars().count() + OFFSET_SEPARATOR_CHARS;
            sub
        })
        .collect();

    debug!(
        page = %page_name,
        section = %source.section,
        subsections = subsections.len(),
        "built document"
    );

    Ok(ManDoc {
        document_id: DocumentId::new(version_tag, &page_name, &source.section),
        version_tag: version_tag.to_string(),
        page_name,
        section: source.section.clone(),
        title: name_line.title,
        aliases: name_line.aliases,
        see_also,
        source_path: source.path.display().to_string(),
        license_text,
        created_at: Utc::now(),
        name_raw: non_empty(name_text),
        synopsis_raw: non_empty(sections.get("SYNOPSIS").unwrap_or_default()),
        subsections,
    })
}

/// First dot-separated segment of the file name, sanitized.
fn fallback_page_name(source: &SourceFile) -> String {
    let stem = source.file_name().split('.').next().unwrap_or_default();
    sanitize_page_name(stem)
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use manpager_markdown::parse_sections;

    use super::*;

    #[test]
    fn name_line_with_aliases_and_title() {
        let parsed = parse_name_line("getcwd, getwd — get current working directory");
        assert_eq!(parsed.canonical.as_deref(), Some("getcwd"));
        assert_eq!(parsed.aliases, vec!["getwd"]);
        assert_eq!(parsed.title.as_deref(), Some("get current working directory"));
    }

    #[test]
    fn name_line_variants() {
        let parsed = parse_name_line("\n\nls - list directory contents\nignored");
        assert_eq!(parsed.canonical.as_deref(), Some("ls"));
        assert!(parsed.aliases.is_empty());

        let parsed = parse_name_line("a,b,  c – three dashes - here");
        assert_eq!(parsed.aliases, vec!["b", "c"]);
        assert_eq!(parsed.title.as_deref(), Some("three dashes - here"));

        let parsed = parse_name_line("x-y-z");
        assert_eq!(parsed.canonical.as_deref(), Some("x-y-z"));
        assert_eq!(parsed.title, None);

        assert_eq!(parse_name_line("   \n"), NameLine::default());
    }

    #[test]
    fn sanitizes_page_names() {
        assert_eq!(sanitize_page_name("sys/stat.h"), "sys_stat.h");
        assert_eq!(sanitize_page_name("/weird:name?"), "weird_name");
        assert_eq!(sanitize_page_name("***"), "");
    }

    #[test]
    fn builds_document_from_sections() {
        let text = "# NAME\ngetcwd, getwd - get current working directory\n\
# SYNOPSIS\nchar *getcwd(char *buf, size_t size);\n\
# SEE ALSO\nchdir(2), realpath(3), chdir(2)\n\
# COPYRIGHT\n\n# COLOPHON\nThis page is part of release 6.9.\n";
        let sections = parse_sections(text);
        let source = SourceFile::new("/src/man3/getcwd.3");

        let doc = build_document(&source, &sections, "6.9").unwrap();

        assert_eq!(doc.document_id.to_string(), "man:6.9:getcwd:3");
        assert_eq!(doc.page_name, "getcwd");
        assert_eq!(doc.section, "3");
        assert_eq!(doc.aliases, vec!["getwd"]);
        assert_eq!(doc.title.as_deref(), Some("get current working directory"));
        assert_eq!(doc.see_also, vec!["chdir(2)", "realpath(3)"]);
        assert_eq!(
            doc.license_text.as_deref(),
            Some("This page is part of release 6.9.")
        );
        assert_eq!(
            doc.synopsis_raw.as_deref(),
            Some("char *getcwd(char *buf, size_t size);")
        );
        assert_eq!(doc.source_path, "/src/man3/getcwd.3");

        let offsets: Vec<usize> = doc.subsections.iter().map(|s| s.start_offset).collect();
        let name_len = "getcwd, getwd - get current working directory".chars().count();
        let synopsis_len = "char *getcwd(char *buf, size_t size);".chars().count();
        assert_eq!(offsets[0], 0);
        assert_eq!(offsets[1], name_len + 2);
        assert_eq!(offsets[2], name_len + 2 + synopsis_len + 2);
    }

    #[test]
    fn falls_back_to_file_name() {
        let sections = parse_sections("# DESCRIPTION\nno name here\n");
        let source = SourceFile::new("/src/man3/pthread_attr_init.3p");

        let doc = build_document(&source, &sections, "6.9").unwrap();
        assert_eq!(doc.page_name, "pthread_attr_init");
        assert_eq!(doc.section, "3p");
        assert_eq!(doc.name_raw, None);
        assert_eq!(doc.title, None);
    }

    #[test]
    fn license_is_truncated() {
        let long = "c".repeat(LICENSE_MAX_CHARS + 500);
        let sections = parse_sections(&format!("# NAME\nx - y\n# COPYRIGHT\n{long}\n"));
        let doc = build_document(&SourceFile::new("man1/x.1"), &sections, "6.9").unwrap();
        assert_eq!(
            doc.license_text.unwrap().chars().count(),
            LICENSE_MAX_CHARS
        );
    }

    #[test]
    fn identical_input_gives_identical_ids() {
        let sections = parse_sections("# NAME\nopen - open a file\n");
        let source = SourceFile::new("man2/open.2");
        let a = build_document(&source, &sections, "6.9").unwrap();
        let b = build_document(&source, &sections, "6.9").unwrap();
        assert_eq!(a.document_id, b.document_id);
    }
}
