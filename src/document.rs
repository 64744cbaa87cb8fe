//! Page tree plumbing on top of the lopdf object table.
//!
//! The output `Document` owns one flat page tree: the root `Pages` node's
//! `Kids` lists every page directly, in reading order. Fragments are merged
//! by renumbering their objects past `max_id` and reparenting their leaf
//! pages onto that root, so shared resources are referenced, not copied.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::error::{Error, Result};
use crate::settings::Layout;

/// Page attributes a leaf may inherit from its ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

// ========== small helpers ==========
#[inline]
pub(crate) fn dict_get<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok()
}

/// Resolve `obj` to an owned dictionary, following one level of indirection.
pub(crate) fn obj_as_dict_owned(obj: &Object, doc: &Document) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => {
            let d = doc.get_object(*id).ok()?.as_dict().ok()?;
            Some(d.clone())
        }
        _ => None,
    }
}

pub fn pages_root_id(doc: &Document) -> Result<ObjectId> {
    let catalog = doc.catalog()?;
    Ok(catalog.get(b"Pages")?.as_reference()?)
}

/// Page object ids in reading order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Empty document with a catalog and a page tree root sized to `layout`.
pub fn new_document(layout: &Layout) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let catalog_id = doc.new_object_id();

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => Object::Array(vec![]),
        "Count" => Object::Integer(0),
        "MediaBox" => box_object(layout),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    doc.trailer.set(b"Root", catalog_id);
    doc
}

fn box_object(layout: &Layout) -> Object {
    Object::Array(layout.media_box().iter().map(|v| (*v).into()).collect())
}

/// Copy attributes inherited through `Parent` onto the page itself, so the
/// page keeps them once it is moved under a different parent.
fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut found: Vec<(&[u8], Object)> = Vec::new();
    {
        let page = doc.get_object(page_id)?.as_dict()?;
        for key in INHERITABLE {
            if page.has(key) {
                continue;
            }
            let mut cur = page;
            while let Some(Object::Reference(parent_id)) = dict_get(cur, b"Parent") {
                let Ok(parent) = doc.get_object(*parent_id).and_then(Object::as_dict) else {
                    break;
                };
                if let Some(value) = dict_get(parent, key) {
                    found.push((key, value.clone()));
                    break;
                }
                cur = parent;
            }
        }
    }
    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    for (key, value) in found {
        page.set(key, value);
    }
    Ok(())
}

/// Move every page of `add` to the end of `base`, in order.
///
/// Returns the (renumbered) ids of the appended pages.
pub fn append_pages(base: &mut Document, mut add: Document) -> Result<Vec<ObjectId>> {
    let base_pages_id = pages_root_id(base)?;

    add.renumber_objects_with(base.max_id + 1);

    let add_page_ids = page_ids(&add);
    for pid in &add_page_ids {
        materialize_inherited(&mut add, *pid)?;
        let dict = add.get_object_mut(*pid)?.as_dict_mut()?;
        dict.set("Parent", base_pages_id);
    }

    base.objects.extend(add.objects);
    base.max_id = base.objects.keys().map(|(id, _)| *id).max().unwrap_or(base.max_id);

    {
        let pages_dict = base.get_object_mut(base_pages_id)?.as_dict_mut()?;
        let kids = pages_dict.get_mut(b"Kids")?.as_array_mut()?;
        kids.extend(add_page_ids.iter().map(|pid| Object::Reference(*pid)));
        let count = kids.len() as i64;
        pages_dict.set("Count", Object::Integer(count));
    }

    Ok(add_page_ids)
}

/// Put `pages` (already parented to the root) in front of the existing ones.
pub fn insert_pages_front(doc: &mut Document, pages: &[ObjectId]) -> Result<()> {
    let root = pages_root_id(doc)?;
    let pages_dict = doc.get_object_mut(root)?.as_dict_mut()?;
    let kids = pages_dict.get_mut(b"Kids")?.as_array_mut()?;
    let front: Vec<Object> = pages.iter().map(|id| Object::Reference(*id)).collect();
    kids.splice(0..0, front);
    let count = kids.len() as i64;
    pages_dict.set("Count", Object::Integer(count));
    Ok(())
}

/// New page of the configured size, parented to the root but not yet listed
/// in `Kids`.
pub fn new_page(
    doc: &mut Document,
    layout: &Layout,
    resources: Dictionary,
    content: Vec<u8>,
    annots: Vec<Object>,
) -> Result<ObjectId> {
    let pages_id = pages_root_id(doc)?;
    let contents_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let mut page_dict = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => box_object(layout),
        "CropBox" => box_object(layout),
        "Resources" => resources,
        "Contents" => contents_id,
    };
    if !annots.is_empty() {
        page_dict.set("Annots", Object::Array(annots));
    }
    Ok(doc.add_object(page_dict))
}

/// Force every page's MediaBox/CropBox to the configured size.
pub fn enforce_page_size(doc: &mut Document, layout: &Layout) -> Result<()> {
    let box_obj = box_object(layout);
    for pid in page_ids(doc) {
        let dict = doc.get_object_mut(pid)?.as_dict_mut()?;
        dict.set("MediaBox", box_obj.clone());
        dict.set("CropBox", box_obj.clone());
    }
    Ok(())
}

/// Insert `content` as a new stream painted before the page's existing
/// streams.
pub fn prepend_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let mut contents = vec![Object::Reference(stream_id)];
    let old = doc.get_object_mut(page_id)?.as_dict_mut()?.remove(b"Contents");
    match old {
        Some(Object::Array(old)) => contents.extend(old),
        Some(Object::Reference(id)) => match doc.get_object(id)? {
            // `/Contents` may point at an array of streams
            Object::Array(old) => contents.extend(old.iter().cloned()),
            _ => contents.push(Object::Reference(id)),
        },
        Some(old @ Object::Stream(_)) => contents.push(old),
        Some(_) | None => {}
    }
    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Raw bytes of every content stream on the page, in paint order.
pub fn page_content_streams(doc: &Document, page_id: ObjectId) -> Result<Vec<Vec<u8>>> {
    let page = doc.get_object(page_id)?.as_dict()?;
    let mut out = Vec::new();

    let mut push = |obj: &Object| -> Result<()> {
        let stream = match obj {
            Object::Reference(id) => doc.get_object(*id)?.as_stream()?,
            Object::Stream(s) => s,
            _ => return Ok(()),
        };
        let bytes = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        out.push(bytes);
        Ok(())
    };

    let contents = match dict_get(page, b"Contents") {
        Some(Object::Reference(id)) => match doc.get_object(*id)? {
            arr @ Object::Array(_) => Some(arr),
            _ => dict_get(page, b"Contents"),
        },
        other => other,
    };
    match contents {
        Some(Object::Array(arr)) => {
            for o in arr {
                push(o)?;
            }
        }
        Some(o) => push(o)?,
        None => {}
    }
    Ok(out)
}

/// Font resource placed on pages by the binder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontHandle {
    /// key under `/Resources /Font`
    pub resource_name: String,
    pub id: ObjectId,
}

/// Standard-14 font objects of one output document, created once and
/// referenced from every page that needs them.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: BTreeMap<String, FontHandle>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `base_font`, adding the font object to `doc` on first use.
    pub fn font(&mut self, doc: &mut Document, base_font: &str) -> FontHandle {
        let next = self.fonts.len() + 1;
        self.fonts
            .entry(base_font.to_string())
            .or_insert_with(|| {
                let d = dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
                    "Encoding" => "WinAnsiEncoding",
                };
                FontHandle {
                    resource_name: format!("FBind{next}"),
                    id: doc.add_object(d),
                }
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// Make `font` reachable from the page's `/Resources /Font`.
///
/// Registering the same font twice leaves a single entry.
pub fn register_font(doc: &mut Document, page_id: ObjectId, font: &FontHandle) -> Result<()> {
    let mut resources = {
        let page = doc.get_object(page_id)?.as_dict()?;
        dict_get(page, b"Resources")
            .and_then(|obj| obj_as_dict_owned(obj, doc))
            .unwrap_or_else(Dictionary::new)
    };
    let mut fonts = dict_get(&resources, b"Font")
        .and_then(|o| obj_as_dict_owned(o, doc))
        .unwrap_or_else(Dictionary::new);

    if let Some(Object::Reference(existing)) = dict_get(&fonts, font.resource_name.as_bytes()) {
        if *existing == font.id {
            return Ok(());
        }
    }

    fonts.set(font.resource_name.as_bytes(), Object::Reference(font.id));
    resources.set("Font", Object::Dictionary(fonts));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Resources dictionary carrying only `font`.
pub fn font_resources(font: &FontHandle) -> Dictionary {
    let mut fonts = Dictionary::new();
    fonts.set(font.resource_name.as_bytes(), Object::Reference(font.id));
    dictionary! { "Font" => fonts }
}

/// Catalog `/PageLabels`: roman numerals for `front` pages, then decimal
/// from 1.
pub fn set_page_labels(doc: &mut Document, front: usize) -> Result<()> {
    let mut nums = Vec::new();
    if front > 0 {
        nums.push(Object::Integer(0));
        nums.push(Object::Dictionary(dictionary! { "S" => "r" }));
    }
    nums.push(Object::Integer(front as i64));
    nums.push(Object::Dictionary(dictionary! { "S" => "D" }));

    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    let catalog = doc.get_object_mut(catalog_id)?.as_dict_mut()?;
    catalog.set("PageLabels", dictionary! { "Nums" => nums });
    Ok(())
}

/// PDF text string: single-byte when every character is Latin-1, else
/// UTF-16BE with a byte order mark.
pub fn text_string(text: &str) -> Object {
    if text.chars().all(|c| (c as u32) < 0x100) {
        return Object::string_literal(text.chars().map(|c| c as u8).collect::<Vec<u8>>());
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::string_literal(bytes)
}

pub fn set_title(doc: &mut Document, title: &str) {
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(title),
        "Producer" => Object::string_literal("collection-binder"),
    });
    doc.trailer.set("Info", info_id);
}

/// Number of leaf pages listed in the root's `Kids`, checked against `Count`.
pub fn check_page_tree(doc: &Document) -> Result<usize> {
    let root = doc.get_object(pages_root_id(doc)?)?.as_dict()?;
    let kids = root.get(b"Kids")?.as_array()?.len();
    let count = root.get(b"Count")?.as_i64()?;
    if count != kids as i64 {
        return Err(Error::Structure(format!(
            "page tree Count {count} does not match {kids} kids"
        )));
    }
    Ok(kids)
}
