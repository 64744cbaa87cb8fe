//! Per-fragment bookkeeping gathered while fragments are produced.
//!
//! The registry is the single owner of the TOC entry list and the URL map
//! for one run. It is filled strictly in reading order; `FragmentCollector`
//! is the serialization point that restores that order when renders finish
//! out of sequence.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fragment::Fragment;

/// Title used when a fragment's own title cannot be extracted.
pub const UNTITLED: &str = "Untitled";

/// One line of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    /// 1-based page of the body where the fragment starts
    pub page: u32,
    /// nesting depth, 1 for top level
    pub level: u32,
}

/// External reference → page where that reference's content starts.
///
/// Stored values are anchor pages: body pages numbered as if a single page
/// of front matter precedes the body. `resolve` shifts them once the real
/// number of TOC pages is known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlPageMap {
    anchors: HashMap<String, u32>,
}

impl UrlPageMap {
    pub fn anchor(&self, url: &str) -> Option<u32> {
        self.anchors.get(url).copied()
    }

    /// Final 1-based page number of `url`'s fragment in a document that
    /// starts with `toc_pages` TOC pages.
    pub fn resolve(&self, url: &str, toc_pages: u32) -> Option<u32> {
        self.anchor(url).map(|anchor| anchor + toc_pages - toc_pages.min(1))
    }

    /// Copy with every anchor resolved against `toc_pages`.
    pub fn resolved(&self, toc_pages: u32) -> UrlPageMap {
        let anchors = self
            .anchors
            .iter()
            .filter_map(|(url, _)| Some((url.clone(), self.resolve(url, toc_pages)?)))
            .collect();
        UrlPageMap { anchors }
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.anchors.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRegistry {
    entries: Vec<TocEntry>,
    urls: UrlPageMap,
    /// first page of the next fragment (1-based, body-relative)
    next_page: u32,
}

impl Default for FragmentRegistry {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            urls: UrlPageMap::default(),
            next_page: 1,
        }
    }
}

/// A reference must name something: non-blank, no embedded whitespace or
/// control characters.
fn check_reference(reference: &str) -> Result<()> {
    let trimmed = reference.trim();
    if trimmed.is_empty() || trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::MalformedReference {
            reference: reference.to_string(),
        });
    }
    Ok(())
}

impl FragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished fragment. Must be called in reading order.
    ///
    /// The entry's page is the running counter before this fragment's pages
    /// are counted; the URL anchor is one past it.
    pub fn register(
        &mut self,
        source_reference: &str,
        title: Option<&str>,
        level: u32,
        page_count: u32,
    ) -> Result<&TocEntry> {
        check_reference(source_reference)?;
        let reference = source_reference.trim();
        if page_count == 0 {
            return Err(Error::EmptyFragment {
                reference: reference.to_string(),
            });
        }

        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => {
                warn!("No title for {reference}, using {UNTITLED:?}");
                UNTITLED.to_string()
            }
        };

        let start = self.next_page;
        if self.urls.anchors.contains_key(reference) {
            warn!("{reference} registered twice; links keep pointing at page {start} of the first copy");
        } else {
            self.urls.anchors.insert(reference.to_string(), start + 1);
        }
        self.next_page += page_count;

        info!("Produced {page_count} page(s) starting on {start}: {title}");
        self.entries.push(TocEntry {
            title,
            page: start,
            level: level.max(1),
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn urls(&self) -> &UrlPageMap {
        &self.urls
    }

    /// Body pages registered so far.
    pub fn body_pages(&self) -> u32 {
        self.next_page - 1
    }
}

/// Reorders fragment completions into request order before registering
/// them.
#[derive(Debug, Default)]
pub struct FragmentCollector {
    registry: FragmentRegistry,
    next: usize,
    /// `None` marks an abandoned request
    pending: BTreeMap<usize, Option<Fragment>>,
    accepted: Vec<Fragment>,
}

impl FragmentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragment for request `index` finished rendering.
    pub fn complete(&mut self, index: usize, fragment: Fragment) {
        self.arrive(index, Some(fragment));
    }

    /// Request `index` failed; later fragments no longer wait for it.
    pub fn abandon(&mut self, index: usize) {
        self.arrive(index, None);
    }

    fn arrive(&mut self, index: usize, fragment: Option<Fragment>) {
        if index < self.next || self.pending.contains_key(&index) {
            warn!("Request {index} completed twice; keeping the first result");
            return;
        }
        if index > self.next {
            debug!("Request {index} finished early, waiting for {}", self.next);
        }
        self.pending.insert(index, fragment);
        while let Some(slot) = self.pending.remove(&self.next) {
            if let Some(f) = slot {
                self.accept(f);
            }
            self.next += 1;
        }
    }

    fn accept(&mut self, fragment: Fragment) {
        let title = fragment.resolved_title();
        let registered = self.registry.register(
            &fragment.source_reference,
            title.as_deref(),
            fragment.level,
            fragment.page_count(),
        );
        match registered {
            Ok(_) => self.accepted.push(fragment),
            Err(e) => warn!("Skipping fragment {:?}: {e}", fragment.source_reference),
        }
    }

    /// Fragments registered so far.
    pub fn registered(&self) -> usize {
        self.accepted.len()
    }

    /// Registry and fragments in reading order. Requests that never
    /// completed are skipped.
    pub fn finish(mut self) -> (FragmentRegistry, Vec<Fragment>) {
        let rest = std::mem::take(&mut self.pending);
        for gap in missing_requests(self.next, rest.keys().copied()) {
            warn!("Requests {gap:?} never completed");
        }
        for (index, slot) in rest {
            self.next = index + 1;
            if let Some(f) = slot {
                self.accept(f);
            }
        }
        (self.registry, self.accepted)
    }
}

/// Request ranges skipped over when the `pending` indices (ascending) are
/// registered starting from `next`.
fn missing_requests(mut next: usize, pending: impl IntoIterator<Item = usize>) -> Vec<Range<usize>> {
    let mut gaps = Vec::new();
    for index in pending {
        if index > next {
            gaps.push(next..index);
        }
        next = index + 1;
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::tests::blank_fragment;

    #[test]
    fn pages_follow_running_counter() {
        let mut reg = FragmentRegistry::new();
        reg.register("https://wiki/Intro", Some("Intro"), 1, 2).unwrap();
        reg.register("https://wiki/Setup", Some("Setup"), 1, 1).unwrap();
        reg.register("https://wiki/Details", Some("Details"), 1, 3).unwrap();

        let pages: Vec<u32> = reg.entries().iter().map(|e| e.page).collect();
        assert_eq!(pages, vec![1, 3, 4]);
        assert_eq!(reg.body_pages(), 6);

        assert_eq!(reg.urls().anchor("https://wiki/Intro"), Some(2));
        assert_eq!(reg.urls().anchor("https://wiki/Setup"), Some(4));
        assert_eq!(reg.urls().anchor("https://wiki/Details"), Some(5));
    }

    #[test]
    fn resolve_shifts_by_extra_toc_pages() {
        let mut reg = FragmentRegistry::new();
        reg.register("a", Some("A"), 1, 2).unwrap();
        reg.register("b", Some("B"), 1, 1).unwrap();

        // one TOC page: anchors are already final
        assert_eq!(reg.urls().resolve("b", 1), Some(4));
        // three TOC pages: body page 3 becomes page 6
        assert_eq!(reg.urls().resolve("b", 3), Some(6));
        assert_eq!(reg.urls().resolved(3).anchor("a"), Some(4));
        assert_eq!(reg.urls().resolve("missing", 1), None);

        let mut all: Vec<(&str, u32)> = reg.urls().iter().collect();
        all.sort();
        assert_eq!(all, vec![("a", 2), ("b", 4)]);
    }

    #[test]
    fn blank_title_falls_back() {
        let mut reg = FragmentRegistry::new();
        let entry = reg.register("a", Some("   "), 2, 1).unwrap();
        assert_eq!(entry.title, UNTITLED);
        assert_eq!(entry.level, 2);
        let entry = reg.register("b", None, 0, 1).unwrap();
        assert_eq!(entry.title, UNTITLED);
        assert_eq!(entry.level, 1);
    }

    #[test]
    fn malformed_and_empty_are_rejected_without_advancing() {
        let mut reg = FragmentRegistry::new();
        assert!(matches!(
            reg.register("  ", Some("x"), 1, 2),
            Err(Error::MalformedReference { .. })
        ));
        assert!(matches!(
            reg.register("has space", Some("x"), 1, 2),
            Err(Error::MalformedReference { .. })
        ));
        assert!(matches!(
            reg.register("ok", Some("x"), 1, 0),
            Err(Error::EmptyFragment { .. })
        ));
        assert!(reg.entries().is_empty());
        assert_eq!(reg.body_pages(), 0);
    }

    #[test]
    fn duplicate_reference_keeps_first_anchor() {
        let mut reg = FragmentRegistry::new();
        reg.register("a", Some("A"), 1, 2).unwrap();
        reg.register("a", Some("A again"), 1, 1).unwrap();
        assert_eq!(reg.urls().anchor("a"), Some(2));
        assert_eq!(reg.entries().len(), 2);
    }

    #[test]
    fn collector_restores_request_order() {
        let mut in_order = FragmentCollector::new();
        in_order.complete(0, blank_fragment("u0", "Zero", 2));
        in_order.complete(1, blank_fragment("u1", "One", 1));
        in_order.complete(2, blank_fragment("u2", "Two", 3));
        let (expected, _) = in_order.finish();

        let mut shuffled = FragmentCollector::new();
        shuffled.complete(2, blank_fragment("u2", "Two", 3));
        shuffled.complete(0, blank_fragment("u0", "Zero", 2));
        assert_eq!(shuffled.registered(), 1);
        shuffled.complete(1, blank_fragment("u1", "One", 1));
        assert_eq!(shuffled.registered(), 3);
        let (registry, fragments) = shuffled.finish();

        assert_eq!(registry, expected);
        let order: Vec<&str> = fragments.iter().map(|f| f.source_reference.as_str()).collect();
        assert_eq!(order, vec!["u0", "u1", "u2"]);
    }

    #[test]
    fn abandoned_request_releases_later_ones() {
        let mut c = FragmentCollector::new();
        c.complete(1, blank_fragment("u1", "One", 1));
        assert_eq!(c.registered(), 0);
        c.abandon(0);
        assert_eq!(c.registered(), 1);
        let (registry, _) = c.finish();
        assert_eq!(registry.entries()[0].page, 1);
    }

    #[test]
    fn finish_registers_stragglers_past_gaps() {
        let mut c = FragmentCollector::new();
        c.complete(0, blank_fragment("u0", "Zero", 1));
        c.complete(2, blank_fragment("u2", "Two", 1));
        let (registry, fragments) = c.finish();
        assert_eq!(fragments.len(), 2);
        assert_eq!(registry.entries()[1].page, 2);
    }

    #[test]
    fn only_real_gaps_are_missing() {
        assert_eq!(missing_requests(1, [2, 3]), vec![1..2]);
        assert_eq!(missing_requests(1, [1, 2]), Vec::<Range<usize>>::new());
        assert_eq!(missing_requests(0, [2, 3, 6]), vec![0..2, 4..6]);
    }

    #[test]
    fn bad_fragment_is_skipped() {
        let mut c = FragmentCollector::new();
        c.complete(0, blank_fragment("", "Nothing", 1));
        c.complete(1, blank_fragment("u1", "One", 1));
        let (registry, fragments) = c.finish();
        assert_eq!(fragments.len(), 1);
        assert_eq!(registry.entries()[0].title, "One");
    }
}
