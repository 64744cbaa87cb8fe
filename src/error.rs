//! Error types for the collection binder.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for binder operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading inputs.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error from the PDF object layer.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Layout or settings file could not be used.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Fragment manifest could not be read or parsed.
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// A fragment carries no usable source reference.
    #[error("Malformed source reference: {reference:?}")]
    MalformedReference { reference: String },

    /// A fragment rendered to zero pages.
    #[error("Fragment {reference} has no pages")]
    EmptyFragment { reference: String },

    /// A TOC entry or link points past the assembled document.
    #[error("No page {page} in assembled document (entry {title:?})")]
    MissingDestination { title: String, page: u32 },

    /// The assembled document could not be written.
    #[error("Failed to save {}: {reason}", path.display())]
    Persist { path: PathBuf, reason: String },

    /// The page tree or another required structure is broken.
    #[error("Broken document structure: {0}")]
    Structure(String),
}
