//! Post-processing: deterministic cleanup of vendor-generated Markdown.
//!
//! Chat models follow the report prompt loosely. They wrap the answer in
//! ` ```markdown ` fences, mix CRLF line endings, use `*` or `•` for list
//! items and quote source sentences with `>`. The layout engine only knows a
//! small Markdown subset, so these rules fold the common variants into the
//! shapes it recognises without touching the wording.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so the fence regex
//! sees the raw answer; list and quote rewriting run on normalised lines;
//! the final-newline pass runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to the raw vendor output.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Fold `***`, `* * *`, `___` and `- - -` into `---`
/// 5. Rewrite `*`, `+` and `•` list markers as `-`
/// 6. Unwrap `>` block quotes into plain lines
/// 7. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 8. Collapse 3+ consecutive blank lines down to 2
/// 9. Ensure the text ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = fold_thematic_breaks(&s);
    let s = normalise_list_markers(&s);
    let s = unwrap_block_quotes(&s);
    let s = remove_invisible_chars(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Fold thematic breaks ──────────────────────────────────────────────

static RE_THEMATIC_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:(?:\*[ \t]*){3,}|(?:_[ \t]*){3,}|(?:-[ \t]*){3,})$").unwrap()
});

/// `***`, `* * *`, `___` and `- - -` become `---`, the only rule the layout
/// engine draws. Must run before list markers are rewritten.
fn fold_thematic_breaks(input: &str) -> String {
    RE_THEMATIC_BREAK.replace_all(input, "---").to_string()
}

// ── Rule 5: Normalise list markers ───────────────────────────────────────────

static RE_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)(?:[*+•]|➤)[ \t]+").unwrap());

/// `* item`, `+ item`, `• item` and `➤ item` become `- item`.
///
/// A line starting with `**` is bold text, not a list, and is left alone.
fn normalise_list_markers(input: &str) -> String {
    RE_LIST_MARKER.replace_all(input, "$1- ").to_string()
}

// ── Rule 6: Unwrap block quotes ──────────────────────────────────────────────

static RE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:>[ \t]?)+").unwrap());

fn unwrap_block_quotes(input: &str) -> String {
    RE_QUOTE.replace_all(input, "").to_string()
}

// ── Rule 7: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 8: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 9: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
