//! Paginated layout of a Markdown report.
//!
//! [`render`] turns a Markdown subset into fixed-size pages of draw
//! instructions that any PDF library can rasterise. It is a single linear
//! scan over the source lines with a vertical cursor:
//!
//! ```text
//! title block ─▶ for each line: classify ─▶ draw ─▶ advance ─▶ overflow? new page
//! ```
//!
//! The function is pure and total. Malformed Markdown degrades to plain
//! paragraphs; there is no error path, so callers can always hand the
//! result to the PDF writer.
//!
//! Layout units are millimetres (see [`PageGeometry::a4`]); font sizes are
//! points. Inline `**bold**` markers are removed from the text stream, while
//! headings and the title are drawn in the bold face.

pub mod markdown;
pub mod measure;

use crate::error::ReportError;
use markdown::{classify, strip_bold, LineKind};
use measure::{wrap_text, HelveticaMetrics, TextMeasure};
use serde::Serialize;

/// Fixed heading drawn at the top of the first page.
pub const TITLE: &str = "Analysis Results";
pub const TITLE_FONT_SIZE: f32 = 20.0;
const TITLE_GAP: f32 = 15.0;

pub const BODY_FONT_SIZE: f32 = 10.0;
pub const LINE_HEIGHT: f32 = 6.0;

const RULE_OFFSET: f32 = 2.0;
const RULE_GAP: f32 = 8.0;

const HEADING_GAP: f32 = 8.0;
pub const MIN_HEADING_FONT_SIZE: f32 = 8.0;

const BULLET_MARKER_INSET: f32 = 2.0;
const BULLET_MARKER_RISE: f32 = 2.0;
const BULLET_TEXT_INDENT: f32 = 8.0;
const BULLET_WRAP_INSET: f32 = 10.0;
const BULLET_TRAILING_GAP: f32 = 2.0;

// ── Input ────────────────────────────────────────────────────────────────────

/// Markdown source as an ordered list of raw lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
}

impl Document {
    /// Split Markdown on line breaks; `\r\n` and `\n` are both accepted.
    pub fn from_markdown(source: &str) -> Self {
        Self {
            lines: source
                .split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
                .collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl From<&str> for Document {
    fn from(source: &str) -> Self {
        Self::from_markdown(source)
    }
}

/// Page size and margin in layout units.
///
/// Construct through [`PageGeometry::new`], which guarantees a non-empty
/// printable area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    width: f32,
    height: f32,
    margin: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32, margin: f32) -> Result<Self, ReportError> {
        let all_finite = width.is_finite() && height.is_finite() && margin.is_finite();
        if !all_finite || margin < 0.0 {
            return Err(ReportError::InvalidConfig(format!(
                "page geometry must be finite with a non-negative margin, got {width}x{height} margin {margin}"
            )));
        }
        if width <= 2.0 * margin || height <= 2.0 * margin {
            return Err(ReportError::InvalidConfig(format!(
                "margin {margin} leaves no printable area on a {width}x{height} page"
            )));
        }
        Ok(Self {
            width,
            height,
            margin,
        })
    }

    /// A4 portrait in millimetres with a 15 mm margin.
    pub const fn a4() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin: 15.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn printable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Lowest cursor position allowed before a page break.
    pub fn bottom(&self) -> f32 {
        self.height - self.margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

// ── Output ───────────────────────────────────────────────────────────────────

/// A run of text positioned at its baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub content: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub bold: bool,
}

/// One primitive drawing operation in page coordinates (origin top-left).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawInstruction {
    Text(TextRun),
    Rule { x1: f32, y: f32, x2: f32 },
    BulletMarker { x: f32, y: f32 },
}

impl DrawInstruction {
    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            DrawInstruction::Text(run) => Some(run),
            _ => None,
        }
    }
}

/// Instructions for a single page, in drawing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub instructions: Vec<DrawInstruction>,
}

/// The laid-out document. Always holds at least one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderResult {
    geometry: PageGeometry,
    pages: Vec<Page>,
}

impl RenderResult {
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn instruction_count(&self) -> usize {
        self.pages.iter().map(|p| p.instructions.len()).sum()
    }

    /// All text runs across pages, in emission order.
    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.pages
            .iter()
            .flat_map(|p| p.instructions.iter())
            .filter_map(DrawInstruction::as_text)
    }
}

// ── Rendering ────────────────────────────────────────────────────────────────

/// Font size for a heading of `level` (1 = largest).
pub fn heading_font_size(level: u8) -> f32 {
    (20.0 - 2.0 * level as f32).max(MIN_HEADING_FONT_SIZE)
}

/// Lay out `document` with the built-in Helvetica metrics.
pub fn render(document: &Document, geometry: &PageGeometry) -> RenderResult {
    render_with(document, geometry, &HelveticaMetrics::millimetres())
}

/// Lay out `document`, measuring text with `measure`.
pub fn render_with(
    document: &Document,
    geometry: &PageGeometry,
    measure: &dyn TextMeasure,
) -> RenderResult {
    let mut layout = Layout::new(*geometry, measure);
    layout.title();
    for line in document.lines() {
        match classify(line) {
            LineKind::Blank => continue,
            LineKind::Rule => layout.rule(),
            LineKind::Heading { level, text } => layout.heading(level, text),
            LineKind::Bullet(text) => layout.bullet(text),
            LineKind::Paragraph(text) => layout.paragraph(text),
        }
        layout.break_if_overflowing();
    }
    layout.finish()
}

/// Mutable state of one render call: the cursor and the pages built so far.
struct Layout<'m> {
    geometry: PageGeometry,
    measure: &'m dyn TextMeasure,
    pages: Vec<Page>,
    y: f32,
}

impl<'m> Layout<'m> {
    fn new(geometry: PageGeometry, measure: &'m dyn TextMeasure) -> Self {
        Self {
            geometry,
            measure,
            pages: vec![Page::default()],
            y: geometry.margin,
        }
    }

    fn emit(&mut self, instruction: DrawInstruction) {
        // `pages` is created non-empty and only ever grows.
        if let Some(page) = self.pages.last_mut() {
            page.instructions.push(instruction);
        }
    }

    fn text(&mut self, content: String, x: f32, y: f32, font_size: f32, bold: bool) {
        self.emit(DrawInstruction::Text(TextRun {
            content,
            x,
            y,
            font_size,
            bold,
        }));
    }

    fn title(&mut self) {
        let width = self.measure.text_width(TITLE, TITLE_FONT_SIZE, true);
        let x = ((self.geometry.width - width) / 2.0).max(0.0);
        self.text(TITLE.to_string(), x, self.y, TITLE_FONT_SIZE, true);
        self.y += TITLE_GAP;
    }

    fn rule(&mut self) {
        let g = self.geometry;
        self.emit(DrawInstruction::Rule {
            x1: g.margin,
            y: self.y - RULE_OFFSET,
            x2: g.width - g.margin,
        });
        self.y += RULE_GAP;
    }

    fn heading(&mut self, level: u8, text: &str) {
        let size = heading_font_size(level);
        let step = size / 2.0;
        self.y += HEADING_GAP;
        let plain = strip_bold(text);
        let lines = wrap_text(
            self.measure,
            &plain,
            self.geometry.printable_width(),
            size,
            true,
        );
        let count = lines.len();
        let x = self.geometry.margin;
        for (i, line) in lines.into_iter().enumerate() {
            let y = self.y + i as f32 * step;
            self.text(line, x, y, size, true);
        }
        self.y += step * count as f32;
    }

    fn bullet(&mut self, text: &str) {
        let g = self.geometry;
        self.emit(DrawInstruction::BulletMarker {
            x: g.margin + BULLET_MARKER_INSET,
            y: self.y - BULLET_MARKER_RISE,
        });
        let plain = strip_bold(text);
        let lines = wrap_text(
            self.measure,
            &plain,
            g.printable_width() - BULLET_WRAP_INSET,
            BODY_FONT_SIZE,
            false,
        );
        let x = g.margin + BULLET_TEXT_INDENT;
        for line in lines {
            let y = self.y;
            self.text(line, x, y, BODY_FONT_SIZE, false);
            self.y += LINE_HEIGHT;
        }
        self.y += BULLET_TRAILING_GAP;
    }

    fn paragraph(&mut self, text: &str) {
        let plain = strip_bold(text);
        let lines = wrap_text(
            self.measure,
            &plain,
            self.geometry.printable_width(),
            BODY_FONT_SIZE,
            false,
        );
        let x = self.geometry.margin;
        for line in lines {
            let y = self.y;
            self.text(line, x, y, BODY_FONT_SIZE, false);
            self.y += LINE_HEIGHT;
        }
    }

    /// Blocks are never split: the check runs once a whole block is placed.
    fn break_if_overflowing(&mut self) {
        if self.y > self.geometry.bottom() {
            self.pages.push(Page::default());
            self.y = self.geometry.margin;
        }
    }

    fn finish(self) -> RenderResult {
        RenderResult {
            geometry: self.geometry,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_sizes_follow_level() {
        assert_eq!(heading_font_size(1), 18.0);
        assert_eq!(heading_font_size(3), 14.0);
        assert_eq!(heading_font_size(6), 8.0);
        assert_eq!(heading_font_size(9), MIN_HEADING_FONT_SIZE);
    }

    #[test]
    fn geometry_rejects_oversized_margin() {
        assert!(PageGeometry::new(100.0, 100.0, 50.0).is_err());
        assert!(PageGeometry::new(100.0, 300.0, 60.0).is_err());
        assert!(PageGeometry::new(f32::NAN, 100.0, 10.0).is_err());
        assert!(PageGeometry::new(100.0, 100.0, -1.0).is_err());
        assert!(PageGeometry::new(100.0, 100.0, 49.0).is_ok());
    }

    #[test]
    fn a4_printable_width() {
        let g = PageGeometry::a4();
        assert_eq!(g.printable_width(), 180.0);
        assert_eq!(g.bottom(), 282.0);
    }

    #[test]
    fn document_splits_crlf() {
        let doc = Document::from_markdown("a\r\nb\nc");
        assert_eq!(doc.lines(), ["a", "b", "c"]);
    }

    #[test]
    fn title_is_centred_and_bold() {
        let result = render(&Document::default(), &PageGeometry::a4());
        let title = result.texts().next().unwrap();
        assert_eq!(title.content, TITLE);
        assert!(title.bold);
        assert_eq!(title.font_size, TITLE_FONT_SIZE);
        assert_eq!(title.y, 15.0);
        let width = HelveticaMetrics::millimetres().text_width(TITLE, TITLE_FONT_SIZE, true);
        assert!((title.x + width / 2.0 - 105.0).abs() < 1e-3);
    }

    #[test]
    fn rule_sits_above_cursor_and_spans_printable_width() {
        let result = render(&Document::from_markdown("---"), &PageGeometry::a4());
        let rule = &result.pages()[0].instructions[1];
        assert_eq!(
            *rule,
            DrawInstruction::Rule {
                x1: 15.0,
                y: 28.0,
                x2: 195.0
            }
        );
    }

    #[test]
    fn cursor_advances_between_blocks() {
        let doc = Document::from_markdown("# Head\nbody\n- item\nafter");
        let result = render(&doc, &PageGeometry::a4());
        let ys: Vec<f32> = result.texts().map(|t| t.y).collect();
        // title 15; heading 15+15+8=38 (advance 9); body 47 (advance 6);
        // bullet 53 (advance 6 + 2); paragraph 61.
        assert_eq!(ys, vec![15.0, 38.0, 47.0, 53.0, 61.0]);
    }

    #[test]
    fn bullet_marker_precedes_indented_text() {
        let result = render(&Document::from_markdown("- item"), &PageGeometry::a4());
        let ins = &result.pages()[0].instructions;
        assert_eq!(ins[1], DrawInstruction::BulletMarker { x: 17.0, y: 28.0 });
        let text = ins[2].as_text().unwrap();
        assert_eq!(text.x, 23.0);
        assert_eq!(text.y, 30.0);
        assert!(!text.bold);
    }

    #[test]
    fn heading_text_is_bold_stripped() {
        let result = render(&Document::from_markdown("## **Summary**"), &PageGeometry::a4());
        let heading = result.texts().nth(1).unwrap();
        assert_eq!(heading.content, "Summary");
        assert!(heading.bold);
        assert_eq!(heading.font_size, 16.0);
    }
}
