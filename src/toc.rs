//! Table of contents: pagination, drawing and links.
//!
//! Layout is a pure pass over the entry list. A page is opened, entries are
//! placed top to bottom one line apart, and the page is closed as soon as
//! the next line would drop below the bottom margin plus one line. The first
//! page reserves room for the title; later pages carry a running header
//! instead. Every page takes at least one entry.
//!
//! Entry page numbers are body-relative. Once the number of TOC pages is
//! known it is added to every link destination, so the links land on the
//! final page while the drawn numbers match the body's "Page N" footers.

use log::debug;
use lopdf::{Document, Object, ObjectId};

use crate::annotation::{Action, Fit, LinkAnnotation};
use crate::decorate::{Decorator, text_block};
use crate::document::{FontHandle, font_resources, new_page};
use crate::error::{Error, Result};
use crate::metrics::TextMetrics;
use crate::registry::TocEntry;
use crate::settings::Layout;

pub const TOC_HEADING: &str = "Table of Contents";

/// One entry as placed on a TOC page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedEntry {
    /// position in the input list
    pub index: usize,
    pub text: String,
    pub x: f64,
    /// baseline
    pub y: f64,
    pub link: LinkAnnotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TocPage {
    /// title block drawn on this page (first page only)
    pub has_title: bool,
    pub entries: Vec<PlacedEntry>,
}

pub struct TocPaginator<'a> {
    layout: &'a Layout,
    metrics: TextMetrics,
}

impl<'a> TocPaginator<'a> {
    pub fn new(layout: &'a Layout, metrics: TextMetrics) -> Self {
        Self { layout, metrics }
    }

    /// Baseline of the first entry on a page.
    fn first_line(&self, first_page: bool) -> f64 {
        if first_page {
            self.layout.top() - 2.0 * self.layout.toc_title_size
        } else {
            self.layout.top()
        }
    }

    /// Lowest baseline an entry may be followed from.
    fn floor(&self) -> f64 {
        self.layout.margin + self.layout.line_height
    }

    /// Entries that fit on an otherwise empty page.
    pub fn capacity(&self, first_page: bool) -> usize {
        let span = self.first_line(first_page) - self.floor();
        if span < 0.0 {
            1
        } else {
            (span / self.layout.line_height).floor() as usize + 1
        }
    }

    fn place(&self, index: usize, entry: &TocEntry, y: f64) -> PlacedEntry {
        let size = self.layout.toc_font_size;
        let x = self.layout.margin * entry.level.max(1) as f64;
        let text = format!("{} - {}", entry.title, entry.page);
        let width = self.metrics.measure(&text, size);
        let half = self.layout.line_height / 2.0;
        debug!("Making TOC entry for {} to {}", entry.title, entry.page);
        PlacedEntry {
            index,
            x,
            y,
            link: LinkAnnotation {
                rect: [x, y - half, x + width, y + half],
                action: Action::NoAction,
            },
            text,
        }
    }

    fn lay_out_page(&self, entries: &[TocEntry], start: usize) -> (TocPage, usize) {
        let first = start == 0;
        let mut y = self.first_line(first);
        let mut placed = Vec::new();
        let mut next = start;
        while next < entries.len() {
            placed.push(self.place(next, &entries[next], y));
            next += 1;
            y -= self.layout.line_height;
            if y < self.floor() {
                break;
            }
        }
        (
            TocPage {
                has_title: first,
                entries: placed,
            },
            next,
        )
    }

    /// Lay out all entries. No entries, no pages.
    pub fn paginate(&self, entries: &[TocEntry]) -> Vec<TocPage> {
        let mut pages = Vec::new();
        let mut next = 0;
        while next < entries.len() {
            let (page, after) = self.lay_out_page(entries, next);
            pages.push(page);
            next = after;
        }

        let offset = pages.len() as u32;
        for placed in pages.iter_mut().flat_map(|p| p.entries.iter_mut()) {
            placed.link.action = Action::GoToPage {
                page: entries[placed.index].page + offset,
                fit: Fit::Page,
            };
        }
        pages
    }

    /// Content stream of one TOC page (title and entries).
    pub fn content(&self, page: &TocPage, font: &FontHandle) -> Vec<u8> {
        let mut out = Vec::new();
        if page.has_title {
            out.extend(text_block(
                font,
                self.layout.toc_title_size,
                self.layout.margin,
                self.layout.top(),
                TOC_HEADING,
            ));
        }
        for placed in &page.entries {
            out.extend(text_block(font, self.layout.toc_font_size, placed.x, placed.y, &placed.text));
        }
        out
    }

    /// Add the TOC pages to `doc` (not yet in the page tree), decorated with
    /// roman numeral footers and, past the first, a running header.
    pub fn render(
        &self,
        doc: &mut Document,
        pages: &[TocPage],
        font: &FontHandle,
        decorator: &Decorator<'_>,
    ) -> Result<Vec<ObjectId>> {
        let mut ids = Vec::with_capacity(pages.len());
        for (i, page) in pages.iter().enumerate() {
            let id = new_page(doc, self.layout, font_resources(font), self.content(page, font), vec![])?;
            if !page.has_title {
                decorator.add_header(doc, id, TOC_HEADING)?;
            }
            decorator.add_footer(doc, id, &roman_lower(i + 1))?;
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Attach the entry links to rendered TOC pages, resolving destinations
/// against the final page order.
pub fn attach_links(
    doc: &mut Document,
    toc_ids: &[ObjectId],
    pages: &[TocPage],
    entries: &[TocEntry],
    page_ids: &[ObjectId],
) -> Result<()> {
    for (id, page) in toc_ids.iter().zip(pages) {
        let mut annots = Vec::with_capacity(page.entries.len());
        for placed in &page.entries {
            if let Action::GoToPage { page: target, .. } = placed.link.action {
                if target == 0 || target as usize > page_ids.len() {
                    return Err(Error::MissingDestination {
                        title: entries[placed.index].title.clone(),
                        page: target,
                    });
                }
            }
            let dict = placed.link.to_dictionary(page_ids)?;
            annots.push(Object::Reference(doc.add_object(dict)));
        }
        let page_dict = doc.get_object_mut(*id)?.as_dict_mut()?;
        page_dict.set("Annots", Object::Array(annots));
    }
    Ok(())
}

/// Lower-case roman numeral (i, ii, iii, iv, ...).
pub fn roman_lower(mut n: usize) -> String {
    const TABLE: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, digits) in TABLE {
        while n >= value {
            out.push_str(digits);
            n -= value;
        }
    }
    out
}
