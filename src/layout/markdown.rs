//! Line classification for the Markdown subset the renderer understands.
//!
//! Only five shapes are recognised: blank lines, horizontal rules, ATX
//! headings, `-` bullets and everything else (paragraphs). Anything the
//! classifier does not recognise is a paragraph, so classification cannot
//! fail.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// The role a single source line plays in the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Empty or whitespace-only; produces nothing.
    Blank,
    /// Trimmed line starts with `---`.
    Rule,
    /// `#`..`######`, whitespace, then the title.
    Heading { level: u8, text: &'a str },
    /// Trimmed line starts with `-`; carries the text after the marker.
    Bullet(&'a str),
    /// Anything else, trimmed.
    Paragraph(&'a str),
}

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

/// Classify one source line. Checks run in priority order; first match wins.
pub fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with("---") {
        return LineKind::Rule;
    }
    if let Some(caps) = RE_HEADING.captures(trimmed) {
        let level = caps[1].len() as u8;
        let text = caps.get(2).map_or("", |m| m.as_str());
        return LineKind::Heading { level, text };
    }
    if let Some(rest) = trimmed.strip_prefix('-') {
        let text = rest.strip_prefix(' ').unwrap_or(rest).trim_start();
        return LineKind::Bullet(text);
    }
    LineKind::Paragraph(trimmed)
}

/// Remove `**…**` delimiters, keeping the inner text in place.
///
/// Unpaired `**` are left untouched.
pub fn strip_bold(text: &str) -> Cow<'_, str> {
    RE_BOLD.replace_all(text, "$1")
}
