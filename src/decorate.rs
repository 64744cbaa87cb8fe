//! Running headers and footers.
//!
//! Each decoration is a self-contained `q BT .. ET Q` block prepended to the
//! page, so it paints with the default graphics state no matter what the
//! body content does afterwards.

use lopdf::{Document, ObjectId};
use pdf_writer::{Content, Name, Str};

use crate::document::{FontHandle, prepend_content, register_font};
use crate::error::Result;
use crate::metrics::{TextMetrics, encode_text};
use crate::settings::Layout;

/// One text-showing block at an absolute position.
pub fn text_block(font: &FontHandle, size: f64, x: f64, y: f64, text: &str) -> Vec<u8> {
    let encoded = encode_text(text);
    let mut content = Content::new();
    content
        .save_state()
        .begin_text()
        .set_font(Name(font.resource_name.as_bytes()), size as f32)
        .set_text_matrix([1.0, 0.0, 0.0, 1.0, x as f32, y as f32])
        .show(Str(&encoded))
        .end_text()
        .restore_state();
    content.finish().to_vec()
}

pub struct Decorator<'a> {
    layout: &'a Layout,
    metrics: TextMetrics,
    font: FontHandle,
}

impl<'a> Decorator<'a> {
    pub fn new(layout: &'a Layout, metrics: TextMetrics, font: FontHandle) -> Self {
        Self { layout, metrics, font }
    }

    fn size(&self) -> f64 {
        self.layout.decoration_font_size
    }

    /// Left-aligned at the margin, two font sizes above the top margin.
    pub fn header_origin(&self) -> (f64, f64) {
        (self.layout.margin, self.layout.top() + 2.0 * self.size())
    }

    /// Right-aligned against the right margin, just below the bottom margin.
    pub fn footer_origin(&self, text: &str) -> (f64, f64) {
        let width = self.metrics.measure(text, self.size());
        (
            self.layout.page_width - width - self.layout.margin,
            self.layout.margin - self.size(),
        )
    }

    pub fn header_block(&self, text: &str) -> Vec<u8> {
        let (x, y) = self.header_origin();
        text_block(&self.font, self.size(), x, y, text)
    }

    pub fn footer_block(&self, text: &str) -> Vec<u8> {
        let (x, y) = self.footer_origin(text);
        text_block(&self.font, self.size(), x, y, text)
    }

    pub fn add_header(&self, doc: &mut Document, page_id: ObjectId, text: &str) -> Result<()> {
        register_font(doc, page_id, &self.font)?;
        prepend_content(doc, page_id, self.header_block(text))
    }

    pub fn add_footer(&self, doc: &mut Document, page_id: ObjectId, text: &str) -> Result<()> {
        register_font(doc, page_id, &self.font)?;
        prepend_content(doc, page_id, self.footer_block(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FontRegistry, new_document, new_page, page_content_streams};
    use lopdf::Dictionary;

    fn handle() -> FontHandle {
        FontHandle {
            resource_name: "FBind1".into(),
            id: (1, 0),
        }
    }

    #[test]
    fn footer_is_right_aligned() {
        let layout = Layout::default();
        let deco = Decorator::new(&layout, TextMetrics::Helvetica, handle());
        let (x, y) = deco.footer_origin("Page 1");
        let width = TextMetrics::Helvetica.measure("Page 1", 10.0);
        assert!((x + width - (612.0 - 72.0)).abs() < 1e-9);
        assert_eq!(y, 62.0);

        // longer text starts further left
        let (x2, _) = deco.footer_origin("Page 100");
        assert!(x2 < x);
    }

    #[test]
    fn header_sits_above_top_margin() {
        let layout = Layout::default();
        let deco = Decorator::new(&layout, TextMetrics::Helvetica, handle());
        assert_eq!(deco.header_origin(), (72.0, 740.0));
    }

    #[test]
    fn block_is_wrapped_in_save_restore() {
        let block = text_block(&handle(), 10.0, 72.0, 740.0, "My (Book)");
        let text = String::from_utf8(block).unwrap();
        assert!(text.trim_start().starts_with('q'));
        assert!(text.trim_end().ends_with('Q'));
        assert!(text.contains("/FBind1 10 Tf"));
        assert!(text.contains("Tj"));
    }

    #[test]
    fn decorating_twice_keeps_one_font_entry() {
        let layout = Layout::default();
        let mut doc = new_document(&layout);
        let pid = new_page(&mut doc, &layout, Dictionary::new(), b"BT ET".to_vec(), vec![]).unwrap();
        let mut fonts = FontRegistry::new();
        let font = fonts.font(&mut doc, &layout.font_family);
        let deco = Decorator::new(&layout, TextMetrics::Helvetica, font);

        deco.add_header(&mut doc, pid, "Collection").unwrap();
        deco.add_footer(&mut doc, pid, "Page 1").unwrap();

        let streams = page_content_streams(&doc, pid).unwrap();
        assert_eq!(streams.len(), 3);
        assert_eq!(streams[2], b"BT ET".to_vec());

        let page = doc.get_object(pid).unwrap().as_dict().unwrap();
        let fonts = page
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Font")
            .unwrap()
            .as_dict()
            .unwrap();
        assert_eq!(fonts.len(), 1);
    }
}
