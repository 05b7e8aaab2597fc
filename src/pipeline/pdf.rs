//! PDF writer: serialise a laid-out report with `printpdf`.
//!
//! Layout coordinates are millimetres measured from the top-left corner with
//! `y` on the text baseline. PDF user space is points from the bottom-left,
//! so every position goes through [`PdfCanvas::point`].
//!
//! Text uses the built-in Helvetica faces, which carry no embedded font
//! program and only cover the WinAnsi range. Characters outside Latin-1 are
//! folded to ASCII look-alikes or `?` before they reach the content stream.

use crate::layout::measure::POINTS_PER_MM;
use crate::layout::{DrawInstruction, PageGeometry, RenderResult, TextRun};
use printpdf::color::Color;
use printpdf::font::BuiltinFont;
use printpdf::graphics::{LinePoint, PaintMode, Point, Polygon, PolygonRing, WindingOrder};
use printpdf::matrix::TextMatrix;
use printpdf::ops::Op;
use printpdf::text::TextItem;
use printpdf::{Mm, PdfDocument, PdfPage, PdfSaveOptions, Pt, Rgb};
use tracing::{debug, warn};

const RULE_THICKNESS_PT: f32 = 0.5;
const BULLET_RADIUS_MM: f32 = 0.8;
const BULLET_SEGMENTS: usize = 16;

/// Serialise `result` to PDF bytes, one PDF page per layout page.
pub fn write_pdf(result: &RenderResult, title: &str) -> Vec<u8> {
    let mut doc = PdfDocument::new(title);
    let geometry = result.geometry();

    for page in result.pages() {
        let mut canvas = PdfCanvas::new(geometry);
        for instruction in &page.instructions {
            canvas.draw(instruction);
        }
        doc.pages.push(PdfPage::new(
            Mm(geometry.width()),
            Mm(geometry.height()),
            canvas.ops,
        ));
    }

    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        warn!("PDF writer reported {} warnings", warnings.len());
    }
    debug!("Wrote {} pages, {} bytes", result.page_count(), bytes.len());
    bytes
}

struct PdfCanvas {
    page_height: f32,
    ops: Vec<Op>,
}

impl PdfCanvas {
    fn new(geometry: &PageGeometry) -> Self {
        Self {
            page_height: geometry.height(),
            ops: Vec::new(),
        }
    }

    /// Layout millimetres (top-left origin) → PDF points (bottom-left origin).
    fn point(&self, x: f32, y: f32) -> Point {
        Point {
            x: Pt(x * POINTS_PER_MM),
            y: Pt((self.page_height - y) * POINTS_PER_MM),
        }
    }

    fn draw(&mut self, instruction: &DrawInstruction) {
        match instruction {
            DrawInstruction::Text(run) => self.text(run),
            DrawInstruction::Rule { x1, y, x2 } => self.rule(*x1, *y, *x2),
            DrawInstruction::BulletMarker { x, y } => self.bullet(*x, *y),
        }
    }

    fn text(&mut self, run: &TextRun) {
        let font = if run.bold {
            BuiltinFont::HelveticaBold
        } else {
            BuiltinFont::Helvetica
        };
        let origin = self.point(run.x, run.y);

        self.ops.push(Op::SetFillColor { col: black() });
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(run.font_size),
            font,
        });
        self.ops.push(Op::SetTextMatrix {
            matrix: TextMatrix::Translate(origin.x, origin.y),
        });
        self.ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(to_win_ansi(&run.content))],
            font,
        });
        self.ops.push(Op::EndTextSection);
    }

    fn rule(&mut self, x1: f32, y: f32, x2: f32) {
        let line = Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    LinePoint { p: self.point(x1, y), bezier: false },
                    LinePoint { p: self.point(x2, y), bezier: false },
                ],
            }],
            mode: PaintMode::Stroke,
            winding_order: WindingOrder::EvenOdd,
        };
        self.ops.push(Op::SetOutlineThickness {
            pt: Pt(RULE_THICKNESS_PT),
        });
        self.ops.push(Op::SetOutlineColor { col: black() });
        self.ops.push(Op::DrawPolygon { polygon: line });
    }

    fn bullet(&mut self, x: f32, y: f32) {
        let points = (0..BULLET_SEGMENTS)
            .map(|i| {
                let angle = i as f32 / BULLET_SEGMENTS as f32 * std::f32::consts::TAU;
                LinePoint {
                    p: self.point(
                        x + BULLET_RADIUS_MM * angle.cos(),
                        y + BULLET_RADIUS_MM * angle.sin(),
                    ),
                    bezier: false,
                }
            })
            .collect();
        let disc = Polygon {
            rings: vec![PolygonRing { points }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::EvenOdd,
        };
        self.ops.push(Op::SetFillColor { col: black() });
        self.ops.push(Op::DrawPolygon { polygon: disc });
    }
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

/// Fold text into what the built-in fonts can show.
fn to_win_ansi(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{2022}' | '\u{25CF}' => '*',
            '\u{2026}' => '.',
            '\t' => ' ',
            c if (c as u32) < 0x20 => ' ',
            c if (c as u32) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{render, Document};

    #[test]
    fn output_is_a_pdf() {
        let result = render(
            &Document::from_markdown("# Protocol\n---\n- step\ntext"),
            &PageGeometry::a4(),
        );
        let bytes = write_pdf(&result, "Analysis Results");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn instructions_map_to_ops() {
        let mut canvas = PdfCanvas::new(&PageGeometry::a4());
        canvas.draw(&DrawInstruction::Rule { x1: 15.0, y: 30.0, x2: 195.0 });
        assert_eq!(canvas.ops.len(), 3);
        assert!(matches!(canvas.ops[2], Op::DrawPolygon { .. }));

        canvas.draw(&DrawInstruction::BulletMarker { x: 17.0, y: 40.0 });
        assert_eq!(canvas.ops.len(), 5);

        canvas.draw(&DrawInstruction::Text(TextRun {
            content: "step".into(),
            x: 23.0,
            y: 42.0,
            font_size: 10.0,
            bold: false,
        }));
        assert!(matches!(canvas.ops.last(), Some(Op::EndTextSection)));
    }

    #[test]
    fn y_axis_is_flipped() {
        let canvas = PdfCanvas::new(&PageGeometry::a4());
        let top = canvas.point(0.0, 0.0);
        let bottom = canvas.point(0.0, 297.0);
        assert!((top.y.0 - 297.0 * POINTS_PER_MM).abs() < 1e-3);
        assert!(bottom.y.0.abs() < 1e-3);
    }

    #[test]
    fn win_ansi_folding() {
        assert_eq!(to_win_ansi("“37 °C” – done…"), "\"37 °C\" - done.");
        assert_eq!(to_win_ansi("µl\tα"), "µl ?");
    }
}
