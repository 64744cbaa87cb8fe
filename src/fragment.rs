//! Rendered fragments handed to the binder and the manifest describing them.

use std::path::{Path, PathBuf};

use log::debug;
use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};

use crate::document::dict_get;
use crate::error::{Error, Result};

/// One already paginated document contributed by the renderer.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// URL the fragment was rendered from; links to it become internal jumps
    pub source_reference: String,
    /// title supplied by the renderer, if any
    pub title: Option<String>,
    pub level: u32,
    pub document: Document,
}

impl Fragment {
    pub fn new(source_reference: impl Into<String>, title: Option<String>, level: u32, document: Document) -> Self {
        Self {
            source_reference: source_reference.into(),
            title,
            level,
            document,
        }
    }

    pub fn load(path: &Path, source_reference: impl Into<String>, title: Option<String>, level: u32) -> Result<Self> {
        debug!("Loading fragment {}", path.display());
        let document = Document::load(path)?;
        Ok(Self::new(source_reference, title, level, document))
    }

    pub fn from_bytes(bytes: &[u8], source_reference: impl Into<String>, title: Option<String>, level: u32) -> Result<Self> {
        let document = Document::load_mem(bytes)?;
        Ok(Self::new(source_reference, title, level, document))
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Renderer title, else the PDF's `/Info /Title`.
    pub fn resolved_title(&self) -> Option<String> {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| info_title(&self.document))
    }
}

/// `/Title` of the document information dictionary.
pub fn info_title(doc: &Document) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok()?,
        Object::Dictionary(d) => d,
        _ => return None,
    };
    match dict_get(info, b"Title")? {
        Object::String(bytes, _) => {
            let title = decode_text_string(bytes);
            let title = title.trim();
            (!title.is_empty()).then(|| title.to_string())
        }
        _ => None,
    }
}

/// PDF text string: UTF-16BE with a byte order mark, else single-byte.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// File name the renderer uses for a reference: characters that file
/// systems reject become `_`.
pub fn sanitize_file_name(reference: &str) -> String {
    reference
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

fn default_level() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// URL the fragment was rendered from
    pub source: String,
    /// rendered PDF, relative to the manifest
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_level")]
    pub level: u32,
}

/// Ordered list of rendered fragments for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub title: String,
    pub fragments: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse a JSON manifest; relative fragment paths resolve against the
    /// manifest's directory.
    pub fn load(path: &Path) -> Result<Manifest> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Manifest(format!("{}: {e}", path.display())))?;
        let mut manifest: Manifest = serde_json::from_str(&raw)
            .map_err(|e| Error::Manifest(format!("{}: {e}", path.display())))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for entry in &mut manifest.fragments {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
        Ok(manifest)
    }
}
