//! Rendered width of stamped text.
//!
//! One `TextMetrics` is built per run from the configured font family and is
//! used for every width the binder needs (footer alignment, TOC link boxes),
//! so all stamped text is measured the same way.

// Helvetica (WinAnsi, 32..126) widths in 1/1000 em
const HELV_W_32_126: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Width used for bytes outside the table, and for every glyph of a
/// monospaced face.
const FALLBACK_W: u16 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMetrics {
    /// Proportional widths of the Helvetica family.
    Helvetica,
    /// Every glyph 600/1000 em (Courier family, or unknown faces).
    Monospace,
}

impl TextMetrics {
    pub fn for_font(base_font: &str) -> TextMetrics {
        if base_font.starts_with("Helvetica") || base_font.starts_with("Arial") {
            TextMetrics::Helvetica
        } else {
            TextMetrics::Monospace
        }
    }

    fn glyph_width(&self, b: u8) -> u16 {
        match self {
            TextMetrics::Helvetica if (32..=126).contains(&b) => HELV_W_32_126[(b - 32) as usize],
            _ => FALLBACK_W,
        }
    }

    /// Width of `text` in PDF units at `font_size`.
    pub fn measure(&self, text: &str, font_size: f64) -> f64 {
        let w1000: f64 = encode_text(text)
            .iter()
            .map(|&b| self.glyph_width(b) as f64)
            .sum();
        w1000 * font_size / 1000.0
    }
}

/// Single-byte encoding used for every string drawn with a standard font.
/// Latin-1 code points map to themselves; anything else becomes `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let cp = c as u32;
            if cp <= 0xFF { cp as u8 } else { b'?' }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths() {
        let m = TextMetrics::Helvetica;
        // "A" = 667
        assert!((m.measure("A", 10.0) - 6.67).abs() < 1e-9);
        assert!((m.measure("Page 1", 1000.0) - (667.0 + 556.0 + 556.0 + 556.0 + 278.0 + 556.0)).abs() < 1e-9);
        assert_eq!(m.measure("", 12.0), 0.0);
    }

    #[test]
    fn monospace_is_per_char() {
        let m = TextMetrics::for_font("Courier");
        assert_eq!(m, TextMetrics::Monospace);
        assert!((m.measure("abcd", 10.0) - 24.0).abs() < 1e-9);
    }

    #[test]
    fn width_is_monotonic_in_prefix() {
        let m = TextMetrics::Helvetica;
        let s = "Détails – chapter 12 (draft)";
        let mut last = 0.0;
        for (i, _) in s.char_indices().skip(1) {
            let w = m.measure(&s[..i], 12.0);
            assert!(w >= last);
            last = w;
        }
        assert!(m.measure(s, 12.0) >= last);
    }

    #[test]
    fn non_latin_falls_back_to_question_mark() {
        assert_eq!(encode_text("é→"), vec![0xE9, b'?']);
    }
}
