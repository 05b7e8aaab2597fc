//! Result types returned by the analysis entry points.

use crate::pipeline::extract::DocumentKind;
use serde::Serialize;

/// A finished analysis: the cleaned Markdown report plus statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutput {
    pub file_name: String,
    pub markdown: String,
    pub stats: AnalysisStats,
}

/// Counters collected while analysing one document.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub document_kind: Option<DocumentKind>,
    /// Characters of extracted text, before truncation.
    pub extracted_chars: usize,
    /// Whether the text was cut to `max_input_chars` before the vendor call.
    pub input_truncated: bool,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub retries: u32,
    pub extract_ms: u64,
    pub llm_ms: u64,
    pub total_ms: u64,
}
