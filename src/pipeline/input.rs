//! Input resolution: turn a user-supplied path or URL into document bytes.
//!
//! The HTTP surface receives bytes directly; this module serves the CLI,
//! which accepts either a local file or an `http(s)://` URL. Both paths end
//! in an [`InputDocument`] carrying the bytes, a file name for extension
//! sniffing and, for downloads, the server's `Content-Type`.

use crate::error::ReportError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A document ready for extraction.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to document bytes.
///
/// URLs are downloaded with `timeout_secs`; anything else is read from disk.
/// Inputs above `max_bytes` are refused before they are fully buffered where
/// the size is known up front.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
    max_bytes: usize,
) -> Result<InputDocument, ReportError> {
    if is_url(input) {
        download_url(input, timeout_secs, max_bytes).await
    } else {
        read_local(Path::new(input), max_bytes).await
    }
}

async fn read_local(path: &Path, max_bytes: usize) -> Result<InputDocument, ReportError> {
    let path_buf = path.to_path_buf();
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| io_error(path_buf.clone(), e))?;
    if !metadata.is_file() {
        return Err(ReportError::FileNotFound { path: path_buf });
    }
    let size = metadata.len() as usize;
    if size > max_bytes {
        return Err(ReportError::FileTooLarge {
            size,
            max: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_error(path_buf.clone(), e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    Ok(InputDocument {
        file_name,
        mime: None,
        bytes,
    })
}

fn io_error(path: PathBuf, e: std::io::Error) -> ReportError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => ReportError::PermissionDenied { path },
        _ => ReportError::FileNotFound { path },
    }
}

async fn download_url(
    url: &str,
    timeout_secs: u64,
    max_bytes: usize,
) -> Result<InputDocument, ReportError> {
    info!("Downloading document from: {}", url);

    let failed = |reason: String| ReportError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ReportError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }
    if let Some(len) = response.content_length() {
        if len as usize > max_bytes {
            return Err(ReportError::FileTooLarge {
                size: len as usize,
                max: max_bytes,
            });
        }
    }

    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let file_name = extract_filename(url);

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    if bytes.len() > max_bytes {
        return Err(ReportError::FileTooLarge {
            size: bytes.len(),
            max: max_bytes,
        });
    }

    info!("Downloaded '{}' ({} bytes)", file_name, bytes.len());
    Ok(InputDocument {
        file_name,
        mime,
        bytes: bytes.to_vec(),
    })
}

/// Take the last path segment of the URL if it looks like a file name.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_extract_filename() {
        assert_eq!(extract_filename("https://x.org/a/protocol.docx?dl=1"), "protocol.docx");
        assert_eq!(extract_filename("https://x.org/a/"), "downloaded");
        assert_eq!(extract_filename("https://x.org/report"), "downloaded");
    }

    #[tokio::test]
    async fn reads_local_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"Centrifuge at 4000 rpm").unwrap();

        let doc = resolve_input(file.path().to_str().unwrap(), 5, 1024)
            .await
            .unwrap();
        assert!(doc.file_name.ends_with(".txt"));
        assert_eq!(doc.bytes, b"Centrifuge at 4000 rpm");
        assert!(doc.mime.is_none());
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.pdf");
        let err = resolve_input(path.to_str().unwrap(), 5, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn oversized_local_file_is_refused() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'x'; 64]).unwrap();
        let err = resolve_input(file.path().to_str().unwrap(), 5, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::FileTooLarge { size: 64, max: 10 }));
    }
}
