//! Text extraction: uploaded bytes → plain text.
//!
//! Three formats are accepted. PDFs go through `pdf-extract`; DOCX files are
//! ZIP archives whose body lives in `word/document.xml`, read with `zip` and
//! walked with `quick-xml`; plain text is decoded as UTF-8.
//!
//! Parsing is CPU-bound and `pdf-extract` can panic on hostile input, so the
//! work runs inside `spawn_blocking`; a panicked task is reported as an
//! extraction failure instead of taking the worker down.

use crate::error::ReportError;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info};

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TEXT_MIME: &str = "text/plain";

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const UTF8_BOM: &str = "\u{FEFF}";

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Decide the format from the declared MIME type, falling back to the
    /// file extension when the MIME type is absent or generic.
    ///
    /// A specific but unsupported MIME type (e.g. `image/png`) is rejected
    /// even if the extension looks right.
    pub fn detect(file_name: &str, mime: Option<&str>) -> Option<Self> {
        let essence = mime.map(|m| {
            m.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        });

        match essence.as_deref() {
            Some(PDF_MIME) => return Some(DocumentKind::Pdf),
            Some(DOCX_MIME) => return Some(DocumentKind::Docx),
            Some(TEXT_MIME) | Some("text/markdown") => return Some(DocumentKind::Text),
            None
            | Some("")
            | Some("application/octet-stream")
            | Some("application/msword")
            | Some("application/vnd.ms-word") => {}
            Some(_) => return None,
        }

        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())?;
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" | "md" => Some(DocumentKind::Text),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => PDF_MIME,
            DocumentKind::Docx => DOCX_MIME,
            DocumentKind::Text => TEXT_MIME,
        }
    }
}

/// Text pulled out of an upload.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub file_name: String,
    pub kind: DocumentKind,
    pub text: String,
}

impl ExtractedText {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Validate, detect and extract an uploaded document.
pub async fn extract(
    file_name: &str,
    mime: Option<&str>,
    bytes: Vec<u8>,
    max_bytes: usize,
) -> Result<ExtractedText, ReportError> {
    if bytes.len() > max_bytes {
        return Err(ReportError::FileTooLarge {
            size: bytes.len(),
            max: max_bytes,
        });
    }

    let kind = DocumentKind::detect(file_name, mime).ok_or_else(|| {
        ReportError::UnsupportedFileType {
            file_name: file_name.to_string(),
            mime: mime.unwrap_or("unknown").to_string(),
        }
    })?;
    debug!("Extracting {:?} text from '{}' ({} bytes)", kind, file_name, bytes.len());

    let name = file_name.to_string();
    let text = tokio::task::spawn_blocking(move || extract_text(kind, &name, &bytes))
        .await
        .map_err(|e| ReportError::ExtractionFailed {
            file_name: file_name.to_string(),
            detail: format!("parser aborted: {e}"),
        })??;

    if text.trim().is_empty() {
        return Err(ReportError::EmptyExtraction {
            file_name: file_name.to_string(),
        });
    }

    info!("Extracted {} characters from '{}'", text.chars().count(), file_name);
    Ok(ExtractedText {
        file_name: file_name.to_string(),
        kind,
        text,
    })
}

/// Blocking extraction for an already-detected format.
pub fn extract_text(kind: DocumentKind, file_name: &str, bytes: &[u8]) -> Result<String, ReportError> {
    let failed = |detail: String| ReportError::ExtractionFailed {
        file_name: file_name.to_string(),
        detail,
    };

    match kind {
        DocumentKind::Pdf => {
            if !bytes.starts_with(PDF_MAGIC) {
                return Err(failed(format!("not a PDF, first bytes: {:?}", magic(bytes))));
            }
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| failed(e.to_string()))
        }
        DocumentKind::Docx => {
            if !bytes.starts_with(ZIP_MAGIC) {
                return Err(failed(format!("not a DOCX archive, first bytes: {:?}", magic(bytes))));
            }
            extract_docx(bytes).map_err(failed)
        }
        DocumentKind::Text => {
            let text = String::from_utf8_lossy(bytes);
            Ok(text.strip_prefix(UTF8_BOM).unwrap_or(&text).to_string())
        }
    }
}

fn magic(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len().min(4)]
}

/// Collect the run text of `word/document.xml`, one line per paragraph.
fn extract_docx(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("failed to open archive: {e}"))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("word/document.xml missing: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("failed to read word/document.xml: {e}"))?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" | b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| format!("bad XML text: {e}"))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
    }

    Ok(out)
}
