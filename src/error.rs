//! Error types for the docreport library.
//!
//! Everything that can fail outside the layout engine surfaces as a
//! [`ReportError`]. The layout engine itself is total: it never returns an
//! error, so the PDF writer always receives a valid page list.
//!
//! Each variant maps to a stable machine-readable [`ReportError::code`] and
//! an HTTP status via [`ReportError::status_code`], which is what the HTTP
//! surface puts on the wire.

use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docreport library.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The upload did not contain a `file` field.
    #[error("No file found in the upload")]
    MissingFile,

    /// The declared type is not PDF, DOCX or plain text.
    #[error("Unsupported file format '{mime}' for '{file_name}'\nSupported: .pdf, .docx, .txt")]
    UnsupportedFileType { file_name: String, mime: String },

    /// The upload exceeds the configured size limit.
    #[error("File is too large: {size} bytes (limit {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    /// The request body was cut off at the body limit before it was read.
    #[error("Upload exceeds the {max}-byte limit")]
    BodyTooLarge { max: usize },

    /// The multipart body could not be parsed.
    #[error("Malformed upload: {0}")]
    InvalidUpload(String),

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The document is corrupt or not what its type claims.
    #[error("Could not extract text from '{file_name}': {detail}")]
    ExtractionFailed { file_name: String, detail: String },

    /// Extraction succeeded but produced no text (e.g. a scanned PDF).
    #[error("No text could be extracted from '{file_name}'")]
    EmptyExtraction { file_name: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No vendor API key is available.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The vendor returned a non-retryable error.
    #[error("LLM API error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    LlmApiError { status: Option<u16>, message: String },

    /// Vendor returned HTTP 429.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Vendor call timed out.
    #[error("API call timed out after {elapsed_ms}ms")]
    ApiTimeout { elapsed_ms: u64 },

    /// Vendor rejected the credentials (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// The vendor answered 2xx but the body had no usable content.
    #[error("Malformed response from LLM API: {0}")]
    MalformedResponse(String),

    // ── Feedback errors ───────────────────────────────────────────────────
    /// A feedback submission is missing required fields.
    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),

    /// The feedback store could not be reached or written.
    #[error("Failed to save feedback: {0}")]
    PersistenceFailed(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or geometry validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// Whether a retry of the same vendor call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ReportError::RateLimitExceeded { .. } | ReportError::ApiTimeout { .. } => true,
            ReportError::LlmApiError { status, .. } => match status {
                Some(s) => *s >= 500,
                None => true,
            },
            _ => false,
        }
    }

    /// Stable error code sent to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::FileNotFound { .. } => "FILE_NOT_FOUND",
            ReportError::PermissionDenied { .. } => "PERMISSION_DENIED",
            ReportError::DownloadFailed { .. } => "DOWNLOAD_FAILED",
            ReportError::DownloadTimeout { .. } => "DOWNLOAD_TIMEOUT",
            ReportError::MissingFile => "MISSING_FILE",
            ReportError::UnsupportedFileType { .. } => "UNSUPPORTED_FILE_TYPE",
            ReportError::FileTooLarge { .. } | ReportError::BodyTooLarge { .. } => "FILE_TOO_LARGE",
            ReportError::InvalidUpload(_) => "INVALID_UPLOAD",
            ReportError::ExtractionFailed { .. } => "EXTRACTION_FAILED",
            ReportError::EmptyExtraction { .. } => "EMPTY_EXTRACTION",
            ReportError::ProviderNotConfigured { .. } => "PROVIDER_NOT_CONFIGURED",
            ReportError::LlmApiError { .. } => "LLM_API_ERROR",
            ReportError::RateLimitExceeded { .. } => "RATE_LIMITED",
            ReportError::ApiTimeout { .. } => "LLM_TIMEOUT",
            ReportError::AuthError { .. } => "LLM_AUTH_ERROR",
            ReportError::MalformedResponse(_) => "LLM_MALFORMED_RESPONSE",
            ReportError::InvalidFeedback(_) => "INVALID_FEEDBACK",
            ReportError::PersistenceFailed(_) => "PERSISTENCE_FAILED",
            ReportError::OutputWriteFailed { .. } => "OUTPUT_WRITE_FAILED",
            ReportError::InvalidConfig(_) => "INVALID_CONFIG",
            ReportError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status used when the error reaches the HTTP surface.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReportError::MissingFile
            | ReportError::UnsupportedFileType { .. }
            | ReportError::EmptyExtraction { .. }
            | ReportError::InvalidUpload(_)
            | ReportError::InvalidFeedback(_) => StatusCode::BAD_REQUEST,
            ReportError::FileTooLarge { .. } | ReportError::BodyTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ReportError::ExtractionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ReportError::FileNotFound { .. } => StatusCode::NOT_FOUND,
            ReportError::ProviderNotConfigured { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ReportError::LlmApiError { .. }
            | ReportError::RateLimitExceeded { .. }
            | ReportError::AuthError { .. }
            | ReportError::MalformedResponse(_)
            | ReportError::DownloadFailed { .. } => StatusCode::BAD_GATEWAY,
            ReportError::ApiTimeout { .. } | ReportError::DownloadTimeout { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
