//! Glyph metrics and line wrapping.
//!
//! The renderer never measures glyphs itself. It asks a [`TextMeasure`] how
//! wide a string is and lets [`wrap_text`] split paragraphs into lines that
//! fit. The built-in [`HelveticaMetrics`] matches the standard-14 fonts the
//! PDF writer draws with, so wrapped lines never overrun the margin in the
//! final document.

/// Measures rendered text width in layout units.
pub trait TextMeasure: Send + Sync {
    /// Width of `text` at `font_size` points, in layout units.
    fn text_width(&self, text: &str, font_size: f32, bold: bool) -> f32;
}

/// Points per millimetre.
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Advance width used for characters outside the ASCII table.
const FALLBACK_WIDTH: u16 = 556;

/// Helvetica advance widths for U+0020..=U+007E, 1/1000 em.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for U+0020..=U+007E, 1/1000 em.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Standard-14 Helvetica metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelveticaMetrics {
    points_per_unit: f32,
}

impl HelveticaMetrics {
    /// Metrics for a layout expressed in millimetres.
    pub fn millimetres() -> Self {
        Self {
            points_per_unit: POINTS_PER_MM,
        }
    }

    /// Metrics for a layout expressed in PDF points.
    pub fn points() -> Self {
        Self {
            points_per_unit: 1.0,
        }
    }

    fn advance(c: char, bold: bool) -> u16 {
        let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
        match c as u32 {
            cp @ 0x20..=0x7E => table[(cp - 0x20) as usize],
            _ => FALLBACK_WIDTH,
        }
    }
}

impl Default for HelveticaMetrics {
    fn default() -> Self {
        Self::millimetres()
    }
}

impl TextMeasure for HelveticaMetrics {
    fn text_width(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        let em: u32 = text.chars().map(|c| Self::advance(c, bold) as u32).sum();
        em as f32 / 1000.0 * font_size / self.points_per_unit
    }
}

/// Split `text` into lines no wider than `max_width`.
///
/// Runs of whitespace collapse to a single space and lines break between
/// words. A word that does not fit on a line by itself is broken between
/// characters; every emitted line holds at least one character, so the
/// result is finite even when `max_width` is smaller than a single glyph.
/// Blank input yields no lines.
pub fn wrap_text(
    measure: &dyn TextMeasure,
    text: &str,
    max_width: f32,
    font_size: f32,
    bold: bool,
) -> Vec<String> {
    let fits = |s: &str| measure.text_width(s, font_size, bold) <= max_width;
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if fits(&candidate) {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if fits(word) {
            current = word.to_string();
        } else {
            let mut chunks = break_word(word, &fits);
            // The tail stays open so following words can share its line.
            current = chunks.pop().unwrap_or_default();
            lines.extend(chunks);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn break_word(word: &str, fits: &dyn Fn(&str) -> bool) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    for c in word.chars() {
        chunk.push(c);
        if !fits(&chunk) && chunk.chars().count() > 1 {
            chunk.pop();
            chunks.push(std::mem::take(&mut chunk));
            chunk.push(c);
        }
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}
