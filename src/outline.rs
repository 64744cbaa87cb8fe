//! Book outline pages in wiki list markup.
//!
//! ```text
//! [[Main_Page|My Book]]
//! * [[Chapter_1|Chapter 1]]
//! :* [[Section_1_1|Section 1.1]]
//! ::* [[Page_1_1_1|Page 1.1.1]]
//! * [[Chapter_2|Chapter 2]]
//! ```
//!
//! The first line names the book (and is its front matter); list items
//! follow in reading order. Chapters are level 1; sections and the pages
//! under them are both level 2. A section needs a chapter before it.

use std::path::Path;

use log::warn;

use crate::error::{Error, Result};
use crate::fragment::{Manifest, ManifestEntry, sanitize_file_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub link: String,
    pub label: String,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    /// label of the book's own link
    pub title: String,
    /// front matter first, then every list item in order
    pub entries: Vec<OutlineEntry>,
}

/// `[[link|label]]` → (link, label); a missing label repeats the link.
pub fn parse_wiki_link(text: &str) -> Result<(String, String)> {
    let malformed = || Error::MalformedReference {
        reference: text.trim().to_string(),
    };
    let start = text.find("[[").ok_or_else(malformed)? + 2;
    let end = start + text[start..].find("]]").ok_or_else(malformed)?;
    let inner = &text[start..end];
    let (link, label) = match inner.split_once('|') {
        Some((link, label)) => (link.trim(), label.trim()),
        None => (inner.trim(), inner.trim()),
    };
    if link.is_empty() {
        return Err(malformed());
    }
    let label = if label.is_empty() { link } else { label };
    Ok((link.to_string(), label.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Chapter,
    Section,
    Page,
}

impl ItemKind {
    fn level(self) -> u32 {
        match self {
            ItemKind::Chapter => 1,
            ItemKind::Section | ItemKind::Page => 2,
        }
    }
}

/// Kind of a list line (`* `, `:* `, `::* `) and the rest.
fn list_item(line: &str) -> Option<(ItemKind, &str)> {
    let colons = line.bytes().take_while(|&b| b == b':').count();
    let rest = line[colons..].strip_prefix('*')?;
    let kind = match colons {
        0 => ItemKind::Chapter,
        1 => ItemKind::Section,
        2 => ItemKind::Page,
        _ => return None,
    };
    Some((kind, rest))
}

impl Outline {
    pub fn parse(raw: &str) -> Result<Outline> {
        let mut lines = raw.lines().map(str::trim).filter(|l| !l.is_empty());
        let first = lines
            .next()
            .ok_or_else(|| Error::Manifest("outline is empty".into()))?;
        let (link, label) = parse_wiki_link(first)?;

        let mut entries = vec![OutlineEntry {
            link,
            label: label.clone(),
            level: 1,
        }];
        let mut in_chapter = false;
        for line in lines {
            let Some((kind, rest)) = list_item(line) else {
                continue;
            };
            let (link, label) = match parse_wiki_link(rest) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Skipping outline line {line:?}: {e}");
                    continue;
                }
            };
            match kind {
                ItemKind::Chapter => in_chapter = true,
                ItemKind::Section if !in_chapter => {
                    return Err(Error::Manifest(format!("section {label:?} comes before any chapter")));
                }
                ItemKind::Page if !in_chapter => {
                    warn!("Skipping page {label:?}: no chapter to hold it");
                    continue;
                }
                ItemKind::Section | ItemKind::Page => {}
            }
            entries.push(OutlineEntry {
                link,
                label,
                level: kind.level(),
            });
        }
        Ok(Outline { title: label, entries })
    }

    pub fn load(path: &Path) -> Result<Outline> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Manifest(format!("{}: {e}", path.display())))?;
        Outline::parse(&raw)
    }

    /// Manifest for fragments rendered as `<fragments_dir>/<sanitized url>.pdf`.
    pub fn into_manifest(self, url_prefix: &str, fragments_dir: &Path) -> Manifest {
        let fragments = self
            .entries
            .into_iter()
            .map(|e| {
                let source = format!("{url_prefix}{}", e.link);
                let path = fragments_dir.join(format!("{}.pdf", sanitize_file_name(&source)));
                ManifestEntry {
                    source,
                    path,
                    title: Some(e.label),
                    level: e.level,
                }
            })
            .collect();
        Manifest {
            title: self.title,
            fragments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const BOOK: &str = "
        [[Main_Page|My Book]]
        * [[Chapter_1|Chapter 1]]
        :* [[Section_1_1|Section 1.1]]
        ::* [[Page_1_1_1|Page 1.1.1]]
        * [[Chapter_2]]
        :* no link here
    ";

    #[test]
    fn parses_levels_in_reading_order() {
        let outline = Outline::parse(BOOK).unwrap();
        assert_eq!(outline.title, "My Book");
        let got: Vec<(&str, &str, u32)> = outline
            .entries
            .iter()
            .map(|e| (e.link.as_str(), e.label.as_str(), e.level))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Main_Page", "My Book", 1),
                ("Chapter_1", "Chapter 1", 1),
                ("Section_1_1", "Section 1.1", 2),
                ("Page_1_1_1", "Page 1.1.1", 2),
                ("Chapter_2", "Chapter_2", 1),
            ]
        );
    }

    #[test]
    fn malformed_links() {
        assert!(matches!(
            parse_wiki_link("no brackets"),
            Err(Error::MalformedReference { .. })
        ));
        assert!(matches!(
            parse_wiki_link("[[|label]]"),
            Err(Error::MalformedReference { .. })
        ));
        assert!(parse_wiki_link("[[open").is_err());
    }

    #[test]
    fn section_before_any_chapter_is_rejected() {
        let raw = "[[Book|Book]]\n:* [[Orphan|Orphan]]\n* [[C|C]]\n::* [[P|P]]";
        assert!(matches!(Outline::parse(raw), Err(Error::Manifest(_))));
    }

    #[test]
    fn pages_sit_at_section_depth() {
        let outline = Outline::parse("[[Book|Book]]\n::* [[Early|Early]]\n* [[C|C]]\n::* [[P|P]]\n:::* [[Deep|Deep]]").unwrap();
        let got: Vec<(&str, u32)> = outline.entries.iter().map(|e| (e.link.as_str(), e.level)).collect();
        assert_eq!(got, vec![("Book", 1), ("C", 1), ("P", 2)]);
    }

    #[test]
    fn empty_outline_is_an_error() {
        assert!(Outline::parse("  \n ").is_err());
    }

    #[test]
    fn manifest_uses_sanitized_file_names() {
        let outline = Outline::parse(BOOK).unwrap();
        let manifest = outline.into_manifest("https://wiki/", Path::new("/tmp/render"));
        assert_eq!(manifest.title, "My Book");
        assert_eq!(manifest.fragments.len(), 5);
        let first = &manifest.fragments[0];
        assert_eq!(first.source, "https://wiki/Main_Page");
        assert_eq!(first.path, PathBuf::from("/tmp/render/https___wiki_Main_Page.pdf"));
        assert_eq!(first.title.as_deref(), Some("My Book"));
        assert_eq!(manifest.fragments[3].level, 2);
    }
}
