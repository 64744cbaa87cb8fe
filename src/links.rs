//! Turning links between fragments into internal jumps.

use std::collections::BTreeSet;

use log::{debug, info};
use lopdf::{Document, ObjectId};

use crate::annotation::{Action, Fit, annotation_slots, read_annotation, set_action};
use crate::document::page_ids;
use crate::error::{Error, Result};
use crate::registry::UrlPageMap;

/// Rewrites `/URI` link actions whose target is a known fragment into
/// `/GoTo` actions.
pub struct LinkRewriter<'a> {
    /// final page numbers, already shifted past the TOC
    urls: &'a UrlPageMap,
    /// every page of the output, in final order
    page_ids: &'a [ObjectId],
}

impl<'a> LinkRewriter<'a> {
    pub fn new(urls: &'a UrlPageMap, page_ids: &'a [ObjectId]) -> Self {
        Self { urls, page_ids }
    }

    /// Rewrite the matching links of one page. Returns how many changed.
    pub fn rewrite_page(&self, doc: &mut Document, page_id: ObjectId) -> Result<usize> {
        let mut rewritten = 0;
        for slot in annotation_slots(doc, page_id)? {
            let annot = read_annotation(doc, page_id, slot)?;
            let url = match Action::of_annotation(doc, &annot, self.page_ids) {
                Some(Action::OpenExternal { url }) => url,
                Some(Action::NoAction | Action::GoToPage { .. }) | None => continue,
            };
            let Some(page) = self.urls.anchor(&url) else {
                debug!("Leaving external link {url}");
                continue;
            };
            let action = Action::GoToPage { page, fit: Fit::Page }
                .to_object(self.page_ids)
                .map_err(|e| match e {
                    Error::MissingDestination { page, .. } => Error::MissingDestination { title: url.clone(), page },
                    other => other,
                })?;
            if let Some(action) = action {
                info!("Updating link: {url} to page {page}");
                set_action(doc, page_id, slot, action)?;
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }

    pub fn rewrite_pages(&self, doc: &mut Document, pages: &[ObjectId]) -> Result<usize> {
        let mut total = 0;
        for pid in pages {
            total += self.rewrite_page(doc, *pid)?;
        }
        Ok(total)
    }
}

/// External link targets per page (1-based page number), pages without
/// links omitted.
pub fn extract_urls(doc: &Document) -> Result<Vec<(u32, BTreeSet<String>)>> {
    let ids = page_ids(doc);
    let mut out = Vec::new();
    for (i, pid) in ids.iter().enumerate() {
        let mut urls = BTreeSet::new();
        for slot in annotation_slots(doc, *pid)? {
            let annot = read_annotation(doc, *pid, slot)?;
            if let Some(Action::OpenExternal { url }) = Action::of_annotation(doc, &annot, &ids) {
                urls.insert(url);
            }
        }
        if !urls.is_empty() {
            out.push((i as u32 + 1, urls));
        }
    }
    Ok(out)
}
