#![allow(dead_code)]

use std::path::{Path, PathBuf};

use collection_binder::annotation::{Action, annotation_slots, read_annotation};
use collection_binder::document::{page_content_streams, page_ids};
use collection_binder::{Manifest, ManifestEntry};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// A rendered fragment: `links[i]` are the URI links on page `i`.
pub struct FragmentSpec<'a> {
    pub source: &'a str,
    pub title: Option<&'a str>,
    pub pages: usize,
    pub links: Vec<Vec<&'a str>>,
}

impl<'a> FragmentSpec<'a> {
    pub fn new(source: &'a str, title: &'a str, pages: usize) -> Self {
        Self {
            source,
            title: Some(title),
            pages,
            links: Vec::new(),
        }
    }

    pub fn with_links(mut self, page: usize, urls: &[&'a str]) -> Self {
        if self.links.len() <= page {
            self.links.resize(page + 1, Vec::new());
        }
        self.links[page].extend_from_slice(urls);
        self
    }
}

/// Letter-sized PDF whose pages share one font resource through the page
/// tree root, the way browser print output is laid out.
pub fn fragment_pdf(spec: &FragmentSpec<'_>) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });

    let mut kids = Vec::new();
    for i in 0..spec.pages {
        let body = format!("BT /F1 12 Tf 72 700 Td ({} body {}) Tj ET", spec.source, i + 1);
        let contents_id = doc.add_object(Stream::new(Dictionary::new(), body.into_bytes()));

        let mut annots = Vec::new();
        for url in spec.links.get(i).map(Vec::as_slice).unwrap_or(&[]) {
            let annot = dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => Object::Array(vec![72.0.into(), 600.0.into(), 200.0.into(), 612.0.into()]),
                "A" => dictionary! {
                    "Type" => "Action",
                    "S" => "URI",
                    "URI" => Object::string_literal(*url),
                },
            };
            annots.push(Object::Reference(doc.add_object(annot)));
        }

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => contents_id,
        };
        if !annots.is_empty() {
            page.set("Annots", Object::Array(annots));
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Count" => Object::Integer(kids.len() as i64),
        "Kids" => Object::Array(kids),
        "MediaBox" => Object::Array(vec![0.0.into(), 0.0.into(), 612.0.into(), 792.0.into()]),
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    if let Some(title) = spec.title {
        let info = doc.add_object(dictionary! { "Title" => Object::string_literal(title) });
        doc.trailer.set("Info", info);
    }
    doc
}

/// Write every fragment into `dir` and return a manifest for them.
pub fn write_fragments(dir: &Path, title: &str, specs: &[FragmentSpec<'_>]) -> Manifest {
    let fragments = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let path = dir.join(format!("fragment_{i}.pdf"));
            fragment_pdf(spec).save(&path).expect("save fragment");
            ManifestEntry {
                source: spec.source.to_string(),
                path,
                title: None,
                level: 1,
            }
        })
        .collect();
    Manifest {
        title: title.to_string(),
        fragments,
    }
}

pub fn load(path: &PathBuf) -> Document {
    let mut doc = Document::load(path).expect("load output");
    let _ = doc.decompress();
    doc
}

/// Actions of every annotation on page `n` (1-based).
pub fn page_actions(doc: &Document, n: usize) -> Vec<Option<Action>> {
    let ids = page_ids(doc);
    let pid: ObjectId = ids[n - 1];
    annotation_slots(doc, pid)
        .unwrap()
        .into_iter()
        .map(|slot| Action::of_annotation(doc, &read_annotation(doc, pid, slot).unwrap(), &ids))
        .collect()
}

/// All content of page `n` (1-based) as text.
pub fn page_text(doc: &Document, n: usize) -> String {
    let pid = page_ids(doc)[n - 1];
    page_content_streams(doc, pid)
        .unwrap()
        .iter()
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}
