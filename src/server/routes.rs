//! Route handlers.

use super::AppState;
use crate::analyze::{analyze_upload, render_report_pdf};
use crate::content::{default_features, Feature};
use crate::error::ReportError;
use crate::feedback::NewFeedback;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

/// Name of the multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Json,
    Pdf,
}

impl ReportFormat {
    fn parse(value: Option<&str>) -> Result<Self, ReportError> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("json") => Ok(ReportFormat::Json),
            Some("pdf") => Ok(ReportFormat::Pdf),
            Some(other) => Err(ReportError::InvalidUpload(format!(
                "unknown format '{other}' (expected json or pdf)"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ParseQuery {
    format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    pub result: String,
    pub file_name: String,
}

struct Upload {
    file_name: String,
    mime: Option<String>,
    bytes: Vec<u8>,
}

// ── /parse ───────────────────────────────────────────────────────────────────

/// POST /parse
///
/// Extract, analyse and return the report for the uploaded `file` field.
pub async fn parse(
    State(state): State<AppState>,
    Query(query): Query<ParseQuery>,
    multipart: Multipart,
) -> Result<Response, ReportError> {
    let format = ReportFormat::parse(query.format.as_deref())?;
    let chat = state.chat()?;
    let upload = read_upload(multipart, state.config().max_upload_bytes).await?;

    let output = analyze_upload(
        chat,
        state.config(),
        &upload.file_name,
        upload.mime.as_deref(),
        upload.bytes,
    )
    .await?;

    match format {
        ReportFormat::Json => Ok(Json(ParseResponse {
            result: output.markdown,
            file_name: output.file_name,
        })
        .into_response()),
        ReportFormat::Pdf => {
            let pdf = render_report_pdf(output.markdown, state.config().geometry).await?;
            info!("Returning {} byte PDF for '{}'", pdf.len(), output.file_name);
            let headers = [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", report_file_name(&output.file_name)),
                ),
            ];
            Ok((headers, pdf).into_response())
        }
    }
}

/// GET /parse
pub async fn parse_status() -> Json<Value> {
    Json(json!({ "message": "Parse API endpoint is working" }))
}

// ── /upload ──────────────────────────────────────────────────────────────────

/// POST /upload
///
/// Older form of `/parse`: same pipeline, report returned as `{message}`.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ReportError> {
    let chat = state.chat()?;
    let upload = read_upload(multipart, state.config().max_upload_bytes).await?;
    let output = analyze_upload(
        chat,
        state.config(),
        &upload.file_name,
        upload.mime.as_deref(),
        upload.bytes,
    )
    .await?;
    Ok(Json(json!({ "message": output.markdown })))
}

/// GET /upload
pub async fn upload_status() -> Json<Value> {
    Json(json!({ "message": "Upload API endpoint is working" }))
}

async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Upload, ReportError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("document")
            .to_string();
        let mime = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;

        return Ok(Upload {
            file_name,
            mime,
            bytes: bytes.to_vec(),
        });
    }

    Err(ReportError::MissingFile)
}

fn multipart_error(e: axum::extract::multipart::MultipartError, max_bytes: usize) -> ReportError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ReportError::BodyTooLarge { max: max_bytes }
    } else {
        ReportError::InvalidUpload(e.body_text())
    }
}

/// `protocol.docx` → `protocol-analysis.pdf`, with header-unsafe characters
/// replaced.
pub fn report_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "report".to_string());
    let safe: String = stem
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}-analysis.pdf")
}

// ── /feedback ────────────────────────────────────────────────────────────────

/// POST /feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    payload: Result<Json<NewFeedback>, JsonRejection>,
) -> Result<Json<Value>, ReportError> {
    let Json(feedback) = payload.map_err(|e| ReportError::InvalidFeedback(e.body_text()))?;
    let saved = state.feedback().insert(feedback).await?;
    info!("Feedback {} received", saved.id);
    Ok(Json(json!({ "success": true })))
}

// ── /test, /features, /health ────────────────────────────────────────────────

/// GET /test
pub async fn test_get() -> Json<Value> {
    Json(json!({ "message": "API is working" }))
}

/// POST /test
pub async fn test_post(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ReportError> {
    let Json(data) = payload.map_err(|e| ReportError::InvalidUpload(e.body_text()))?;
    Ok(Json(json!({ "message": "POST request is working", "data": data })))
}

/// GET /features
pub async fn features() -> Json<Vec<Feature>> {
    Json(default_features())
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    llm_configured: bool,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        llm_configured: state.chat().is_ok(),
    })
}
