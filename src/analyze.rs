//! Analysis entry points.
//!
//! [`analyze_upload`] runs extract → LLM → post-process on bytes received
//! from a client; [`analyze_path`] does the same for a local path or URL.
//! [`render_report_pdf`] lays out a Markdown report and serialises it.
//!
//! The chat client is passed in rather than resolved here so the server can
//! build it once at start-up and share it across requests.

use crate::config::AnalysisConfig;
use crate::error::ReportError;
use crate::layout::{self, Document, PageGeometry, TITLE};
use crate::output::{AnalysisOutput, AnalysisStats};
use crate::pipeline::llm::{self, ChatClient};
use crate::pipeline::{extract, input, pdf, postprocess};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Analyse an uploaded document.
///
/// # Errors
/// - `FileTooLarge`, `UnsupportedFileType`, `ExtractionFailed`,
///   `EmptyExtraction` from the extraction stage
/// - any vendor error left after retries
pub async fn analyze_upload(
    client: &dyn ChatClient,
    config: &AnalysisConfig,
    file_name: &str,
    mime: Option<&str>,
    bytes: Vec<u8>,
) -> Result<AnalysisOutput, ReportError> {
    let total_start = Instant::now();
    info!("Analysing '{}' ({} bytes)", file_name, bytes.len());

    // ── Step 1: Extract text ─────────────────────────────────────────────
    let extract_start = Instant::now();
    let extracted = extract::extract(file_name, mime, bytes, config.max_upload_bytes).await?;
    let extract_ms = extract_start.elapsed().as_millis() as u64;

    // ── Step 2: Ask the vendor ───────────────────────────────────────────
    let report = llm::generate_report(client, file_name, &extracted.text, config).await?;

    // ── Step 3: Clean up ─────────────────────────────────────────────────
    let markdown = postprocess::clean_markdown(&report.markdown);

    let stats = AnalysisStats {
        document_kind: Some(extracted.kind),
        extracted_chars: extracted.char_count(),
        input_truncated: report.truncated,
        prompt_tokens: report.prompt_tokens,
        completion_tokens: report.completion_tokens,
        retries: report.retries,
        extract_ms,
        llm_ms: report.duration_ms,
        total_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Analysed '{}' in {}ms ({} tokens in / {} out)",
        file_name, stats.total_ms, stats.prompt_tokens, stats.completion_tokens
    );

    Ok(AnalysisOutput {
        file_name: file_name.to_string(),
        markdown,
        stats,
    })
}

/// Analyse a local file or an HTTP(S) URL.
pub async fn analyze_path(
    client: &dyn ChatClient,
    config: &AnalysisConfig,
    input_str: impl AsRef<str>,
) -> Result<AnalysisOutput, ReportError> {
    let doc = input::resolve_input(
        input_str.as_ref(),
        config.download_timeout_secs,
        config.max_upload_bytes,
    )
    .await?;
    analyze_upload(client, config, &doc.file_name, doc.mime.as_deref(), doc.bytes).await
}

/// Lay out `markdown` and serialise it to PDF bytes.
///
/// Layout and serialisation are CPU-bound and run on the blocking pool.
pub async fn render_report_pdf(
    markdown: String,
    geometry: PageGeometry,
) -> Result<Vec<u8>, ReportError> {
    tokio::task::spawn_blocking(move || report_pdf(&markdown, &geometry))
        .await
        .map_err(|e| ReportError::Internal(format!("PDF task failed: {e}")))
}

/// Blocking variant of [`render_report_pdf`].
pub fn report_pdf(markdown: &str, geometry: &PageGeometry) -> Vec<u8> {
    let result = layout::render(&Document::from_markdown(markdown), geometry);
    debug!(
        "Laid out {} pages, {} instructions",
        result.page_count(),
        result.instruction_count()
    );
    pdf::write_pdf(&result, TITLE)
}

/// Write `bytes` to `path` via a temp file in the same directory and an
/// atomic rename, so readers never see a partial file.
pub async fn write_atomically(path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), ReportError> {
    let path = path.as_ref().to_path_buf();
    let bytes = bytes.to_vec();

    tokio::task::spawn_blocking(move || -> Result<(), ReportError> {
        let write_failed = |source| ReportError::OutputWriteFailed {
            path: path.clone(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_failed)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_failed)?;
        tmp.write_all(&bytes).map_err(write_failed)?;
        tmp.persist(&path).map_err(|e| write_failed(e.error))?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    })
    .await
    .map_err(|e| ReportError::Internal(format!("write task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{ChatReply, ChatRequest};
    use async_trait::async_trait;

    struct Canned(&'static str);

    #[async_trait]
    impl ChatClient for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<ChatReply, ReportError> {
            Ok(ChatReply {
                content: self.0.to_string(),
                prompt_tokens: 40,
                completion_tokens: 20,
            })
        }
    }

    #[tokio::test]
    async fn upload_is_analysed_and_cleaned() {
        let client = Canned("```markdown\n# Report\r\n* step one\n```");
        let config = AnalysisConfig::default();
        let out = analyze_upload(
            &client,
            &config,
            "protocol.txt",
            Some("text/plain"),
            b"Add 5 ml buffer.".to_vec(),
        )
        .await
        .unwrap();

        assert_eq!(out.file_name, "protocol.txt");
        assert_eq!(out.markdown, "# Report\n- step one\n");
        assert_eq!(out.stats.extracted_chars, 16);
        assert_eq!(out.stats.prompt_tokens, 40);
        assert!(!out.stats.input_truncated);
    }

    #[tokio::test]
    async fn extraction_errors_stop_before_the_vendor() {
        let client = Canned("unused");
        let err = analyze_upload(
            &client,
            &AnalysisConfig::default(),
            "image.png",
            Some("image/png"),
            vec![0x89, b'P', b'N', b'G'],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFileType { .. }));
    }

    #[tokio::test]
    async fn pdf_report_has_pdf_header() {
        let bytes = render_report_pdf("# Report\n- step".into(), PageGeometry::a4())
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn atomic_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.pdf");
        write_atomically(&path, b"%PDF-1.3").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.3");
        let entries = std::fs::read_dir(dir.path().join("nested")).unwrap().count();
        assert_eq!(entries, 1);
    }
}
