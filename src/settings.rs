use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Unit of the page size given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[value(name = "in")]
    Inch,
    Cm,
    #[value(name = "pt")]
    Point,
}

pub fn to_points(v: f64, unit: UnitSystem) -> f64 {
    match unit {
        UnitSystem::Cm => v / 2.54 * 72.0,
        UnitSystem::Inch => v * 72.0,
        UnitSystem::Point => v,
    }
}

/// Page geometry and typography shared by every stage of one assembly run.
///
/// All lengths are PDF units (1/72 in). Missing fields in a layout file keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub page_width: f64,
    pub page_height: f64,
    /// applied equally to top/bottom/left/right
    pub margin: f64,
    /// base font of the standard 14 set used for all stamped text
    pub font_family: String,
    /// header / footer size
    pub decoration_font_size: f64,
    pub toc_font_size: f64,
    /// size of the "Table of Contents" title on the first TOC page
    pub toc_title_size: f64,
    pub line_height: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 72.0,
            font_family: "Helvetica".to_string(),
            decoration_font_size: 10.0,
            toc_font_size: 12.0,
            toc_title_size: 18.0,
            line_height: 20.0,
        }
    }
}

impl Layout {
    /// Read a (possibly partial) JSON layout file.
    pub fn load(path: &Path) -> Result<Layout> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let layout: Layout = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn with_page_size(mut self, width: f64, height: f64) -> Layout {
        self.page_width = width;
        self.page_height = height;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_width <= 0.0 || self.page_height <= 0.0 {
            return Err(Error::Config(format!(
                "page size must be positive, got {}x{}",
                self.page_width, self.page_height
            )));
        }
        if self.line_height <= 0.0 {
            return Err(Error::Config("line_height must be positive".into()));
        }
        if 2.0 * self.margin >= self.page_height.min(self.page_width) {
            return Err(Error::Config(format!(
                "margin {} leaves no room on a {}x{} page",
                self.margin, self.page_width, self.page_height
            )));
        }
        Ok(())
    }

    /// Top margin line, where body text and the TOC title start.
    pub fn top(&self) -> f64 {
        self.page_height - self.margin
    }

    pub fn media_box(&self) -> [f64; 4] {
        [0.0, 0.0, self.page_width, self.page_height]
    }
}

/// Default output file for a collection: spaces become underscores.
pub fn default_output_name(collection_title: &str) -> String {
    format!("{}.pdf", collection_title.trim().replace(' ', "_"))
}
