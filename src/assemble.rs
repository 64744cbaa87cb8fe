//! Final assembly: body, decorations, TOC, internal links, persistence.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};
use lopdf::{Document, ObjectId};

use crate::decorate::Decorator;
use crate::document::{
    FontRegistry, append_pages, check_page_tree, enforce_page_size, insert_pages_front, new_document, page_ids,
    set_page_labels, set_title,
};
use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::links::LinkRewriter;
use crate::metrics::TextMetrics;
use crate::registry::FragmentRegistry;
use crate::settings::Layout;
use crate::toc::{TocPaginator, attach_links};

/// What one run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub toc_pages: usize,
    pub body_pages: usize,
    pub links_rewritten: usize,
    /// set once the document is saved
    pub output: Option<PathBuf>,
}

pub struct Assembler<'a> {
    layout: &'a Layout,
    collection_title: String,
}

impl<'a> Assembler<'a> {
    pub fn new(layout: &'a Layout, collection_title: impl Into<String>) -> Self {
        Self {
            layout,
            collection_title: collection_title.into(),
        }
    }

    /// The registry must describe exactly `fragments`, in the same order.
    fn check_complete(registry: &FragmentRegistry, fragments: &[Fragment]) -> Result<()> {
        let pages: u32 = fragments.iter().map(Fragment::page_count).sum();
        if registry.entries().len() != fragments.len() || registry.body_pages() != pages {
            return Err(Error::Structure(format!(
                "registry holds {} fragments / {} pages, assembly got {} / {}",
                registry.entries().len(),
                registry.body_pages(),
                fragments.len(),
                pages
            )));
        }
        Ok(())
    }

    /// Build the output document in memory.
    pub fn assemble(&self, registry: &FragmentRegistry, fragments: Vec<Fragment>) -> Result<(Document, Assembly)> {
        Self::check_complete(registry, &fragments)?;

        let metrics = TextMetrics::for_font(&self.layout.font_family);
        let mut doc = new_document(self.layout);
        let mut fonts = FontRegistry::new();
        let font = fonts.font(&mut doc, &self.layout.font_family);
        let decorator = Decorator::new(self.layout, metrics, font.clone());

        let paginator = TocPaginator::new(self.layout, metrics);
        let toc = paginator.paginate(registry.entries());
        let toc_pages = toc.len();

        // (1) body pages, decorated as they are appended
        let mut body_ids: Vec<ObjectId> = Vec::new();
        for fragment in fragments {
            let reference = fragment.source_reference;
            let ids = append_pages(&mut doc, fragment.document)?;
            debug!("Adding {} page(s) from {reference}", ids.len());
            for pid in ids {
                decorator.add_header(&mut doc, pid, &self.collection_title)?;
                decorator.add_footer(&mut doc, pid, &format!("Page {}", body_ids.len() + 1))?;
                body_ids.push(pid);
            }
        }

        // (2)-(3) TOC pages in front
        let toc_ids = paginator.render(&mut doc, &toc, &font, &decorator)?;
        insert_pages_front(&mut doc, &toc_ids)?;
        let all_ids = page_ids(&doc);

        let urls = registry.urls().resolved(toc_pages as u32);
        let links_rewritten = LinkRewriter::new(&urls, &all_ids).rewrite_pages(&mut doc, &body_ids)?;
        attach_links(&mut doc, &toc_ids, &toc, registry.entries(), &all_ids)?;

        enforce_page_size(&mut doc, self.layout)?;
        set_page_labels(&mut doc, toc_pages)?;
        set_title(&mut doc, &self.collection_title);
        check_page_tree(&doc)?;

        let _ = doc.prune_objects();

        Ok((
            doc,
            Assembly {
                toc_pages,
                body_pages: body_ids.len(),
                links_rewritten,
                output: None,
            },
        ))
    }

    /// Assemble and save to `output`.
    pub fn assemble_to(&self, registry: &FragmentRegistry, fragments: Vec<Fragment>, output: &Path) -> Result<Assembly> {
        let t0 = Instant::now();
        let (mut doc, mut assembly) = self.assemble(registry, fragments)?;
        let t_assemble = t0.elapsed();

        persist(&mut doc, output)?;
        assembly.output = Some(output.to_path_buf());

        info!(
            "Saved {} ({} TOC + {} body pages, {} links rewritten) in {:.1}ms (assemble {:.1}ms)",
            output.display(),
            assembly.toc_pages,
            assembly.body_pages,
            assembly.links_rewritten,
            t0.elapsed().as_secs_f64() * 1000.0,
            t_assemble.as_secs_f64() * 1000.0,
        );
        Ok(assembly)
    }
}

/// Write `doc` to `path`. Any failure is fatal for the run.
pub fn persist(doc: &mut Document, path: &Path) -> Result<()> {
    let fail = |reason: String| Error::Persist {
        path: path.to_path_buf(),
        reason,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| fail(e.to_string()))?;
    }
    let _ = doc.compress();
    doc.save(path).map_err(|e| fail(e.to_string()))?;
    Ok(())
}
