//! Typed view of link annotations.
//!
//! Annotations are read out of (and written back into) lopdf dictionaries;
//! in between, the action is one of three variants and every decision about
//! it is an exhaustive `match`.

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};

use crate::document::{dict_get, obj_as_dict_owned};
use crate::error::{Error, Result};

/// How the viewer fits the destination page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// `/Fit`: the whole page in the window
    Page,
}

impl Fit {
    fn name(&self) -> &'static str {
        match self {
            Fit::Page => "Fit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// no action, or one the binder does not interpret
    NoAction,
    /// `/S /URI`
    OpenExternal { url: String },
    /// `/S /GoTo` to a page of this document; `page` is 1-based
    GoToPage { page: u32, fit: Fit },
}

impl Action {
    /// Action of a `/Link` annotation. `None` for other subtypes.
    pub fn of_annotation(doc: &Document, annot: &Dictionary, page_ids: &[ObjectId]) -> Option<Action> {
        match dict_get(annot, b"Subtype").and_then(|o| o.as_name().ok()) {
            Some(b"Link") => {}
            _ => return None,
        }
        let Some(action) = dict_get(annot, b"A").and_then(|o| obj_as_dict_owned(o, doc)) else {
            return Some(Action::NoAction);
        };
        Some(Action::from_dictionary(&action, page_ids))
    }

    fn from_dictionary(action: &Dictionary, page_ids: &[ObjectId]) -> Action {
        match dict_get(action, b"S").and_then(|o| o.as_name().ok()) {
            Some(b"URI") => match dict_get(action, b"URI") {
                Some(Object::String(bytes, _)) => Action::OpenExternal {
                    url: String::from_utf8_lossy(bytes).into_owned(),
                },
                _ => Action::NoAction,
            },
            Some(b"GoTo") => {
                let target = dict_get(action, b"D")
                    .and_then(|d| d.as_array().ok())
                    .and_then(|d| d.first())
                    .and_then(|first| first.as_reference().ok())
                    .and_then(|id| page_ids.iter().position(|p| *p == id));
                match target {
                    Some(idx) => Action::GoToPage {
                        page: idx as u32 + 1,
                        fit: Fit::Page,
                    },
                    None => Action::NoAction,
                }
            }
            _ => Action::NoAction,
        }
    }

    /// Action dictionary for `/A`, with page numbers resolved against the
    /// final page order. `None` for `NoAction`.
    pub fn to_object(&self, page_ids: &[ObjectId]) -> Result<Option<Object>> {
        let obj = match self {
            Action::NoAction => return Ok(None),
            Action::OpenExternal { url } => dictionary! {
                "Type" => "Action",
                "S" => "URI",
                "URI" => Object::string_literal(url.as_bytes()),
            },
            Action::GoToPage { page, fit } => {
                let target = page_id(page_ids, *page).ok_or_else(|| Error::MissingDestination {
                    title: String::new(),
                    page: *page,
                })?;
                dictionary! {
                    "Type" => "Action",
                    "S" => "GoTo",
                    "D" => vec![Object::Reference(target), Object::Name(fit.name().as_bytes().to_vec())],
                }
            }
        };
        Ok(Some(Object::Dictionary(obj)))
    }
}

fn page_id(page_ids: &[ObjectId], page: u32) -> Option<ObjectId> {
    let idx = (page as usize).checked_sub(1)?;
    page_ids.get(idx).copied()
}

/// A clickable rectangle placed by the binder.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkAnnotation {
    /// llx, lly, urx, ury
    pub rect: [f64; 4],
    pub action: Action,
}

impl LinkAnnotation {
    /// Borderless `/Link` annotation dictionary.
    pub fn to_dictionary(&self, page_ids: &[ObjectId]) -> Result<Dictionary> {
        let mut d = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => self.rect.iter().map(|v| Object::from(*v)).collect::<Vec<_>>(),
            "Border" => Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)]),
        };
        if let Some(action) = self.action.to_object(page_ids)? {
            d.set("A", action);
        }
        Ok(d)
    }
}

/// Where an annotation dictionary lives, so it can be rewritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotSlot {
    /// indirect object
    Object(ObjectId),
    /// inline dictionary at this index of the page's `/Annots` array
    Inline(usize),
}

/// Slots of every annotation on the page, in `/Annots` order.
pub fn annotation_slots(doc: &Document, page_id: ObjectId) -> Result<Vec<AnnotSlot>> {
    let page = doc.get_object(page_id)?.as_dict()?;
    let annots = match dict_get(page, b"Annots") {
        Some(Object::Array(a)) => a,
        Some(Object::Reference(id)) => doc.get_object(*id)?.as_array()?,
        _ => return Ok(Vec::new()),
    };
    Ok(annots
        .iter()
        .enumerate()
        .filter_map(|(i, o)| match o {
            Object::Reference(id) => Some(AnnotSlot::Object(*id)),
            Object::Dictionary(_) => Some(AnnotSlot::Inline(i)),
            _ => None,
        })
        .collect())
}

/// Owned copy of the annotation in `slot`.
pub fn read_annotation(doc: &Document, page_id: ObjectId, slot: AnnotSlot) -> Result<Dictionary> {
    match slot {
        AnnotSlot::Object(id) => Ok(doc.get_object(id)?.as_dict()?.clone()),
        AnnotSlot::Inline(i) => {
            let arr = page_annots(doc, page_id)?;
            arr.get(i)
                .and_then(|o| o.as_dict().ok())
                .cloned()
                .ok_or_else(|| Error::Structure(format!("annotation {i} vanished from page {page_id:?}")))
        }
    }
}

fn page_annots(doc: &Document, page_id: ObjectId) -> Result<&Vec<Object>> {
    let page = doc.get_object(page_id)?.as_dict()?;
    match page.get(b"Annots")? {
        Object::Reference(id) => Ok(doc.get_object(*id)?.as_array()?),
        other => Ok(other.as_array()?),
    }
}

/// Replace the `/A` entry of the annotation in `slot`.
pub fn set_action(doc: &mut Document, page_id: ObjectId, slot: AnnotSlot, action: Object) -> Result<()> {
    let dict = match slot {
        AnnotSlot::Object(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        AnnotSlot::Inline(i) => {
            let annots_ref = match doc.get_object(page_id)?.as_dict()?.get(b"Annots")? {
                Object::Reference(id) => Some(*id),
                _ => None,
            };
            let arr = match annots_ref {
                Some(id) => doc.get_object_mut(id)?.as_array_mut()?,
                None => doc.get_object_mut(page_id)?.as_dict_mut()?.get_mut(b"Annots")?.as_array_mut()?,
            };
            arr.get_mut(i)
                .ok_or_else(|| Error::Structure(format!("annotation {i} vanished from page {page_id:?}")))?
                .as_dict_mut()?
        }
    };
    dict.set("A", action);
    Ok(())
}
