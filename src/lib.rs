//! Binds independently rendered PDF fragments into one book: body pages in
//! fragment order with running headers and page footers, a generated table
//! of contents in front, and links between fragments turned into internal
//! jumps.

pub mod annotation;
pub mod assemble;
pub mod decorate;
pub mod document;
mod error;
pub mod fragment;
pub mod links;
pub mod metrics;
pub mod outline;
pub mod registry;
pub mod settings;
pub mod toc;

pub use assemble::{Assembler, Assembly, persist};
pub use error::{Error, Result};
pub use fragment::{Fragment, Manifest, ManifestEntry};
pub use registry::{FragmentCollector, FragmentRegistry, TocEntry, UrlPageMap};
pub use settings::Layout;

use std::path::Path;

use log::warn;

/// Load every fragment named by `manifest` and collect them in manifest
/// order. Fragments that fail to load are logged and left out.
pub fn collect_manifest(manifest: &Manifest) -> (FragmentRegistry, Vec<Fragment>) {
    let mut collector = FragmentCollector::new();
    for (index, entry) in manifest.fragments.iter().enumerate() {
        match Fragment::load(&entry.path, entry.source.clone(), entry.title.clone(), entry.level) {
            Ok(fragment) => collector.complete(index, fragment),
            Err(e) => {
                warn!("Skipping {} ({}): {e}", entry.source, entry.path.display());
                collector.abandon(index);
            }
        }
    }
    collector.finish()
}

/// Bind the fragments of `manifest` into `output`.
pub fn bind_manifest(manifest: &Manifest, layout: &Layout, output: &Path) -> Result<Assembly> {
    layout.validate()?;
    let (registry, fragments) = collect_manifest(manifest);
    Assembler::new(layout, manifest.title.clone()).assemble_to(&registry, fragments, output)
}
