//! LLM interaction: send the extracted text to a chat-completion vendor.
//!
//! OpenAI and Perplexity speak the same `chat/completions` JSON contract, so
//! one HTTP client covers both; only the base URL, key variable and default
//! model differ (see [`Vendor`]). The client sits behind the [`ChatClient`]
//! trait so the server and tests can swap in a scripted implementation.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx answers and timeouts are transient. [`generate_report`]
//! retries them with exponential backoff (`retry_backoff_ms * 2^(attempt-1)`),
//! waiting at least as long as a `Retry-After` header asks. Authentication
//! failures, other 4xx answers and malformed bodies are returned at once.

use crate::config::{AnalysisConfig, Vendor};
use crate::error::ReportError;
use crate::prompts::{document_message, REPORT_SYSTEM_PROMPT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Longest `Retry-After` wait we honour.
const MAX_RETRY_AFTER_SECS: u64 = 60;

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single completion request. The model is a property of the client.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Something that can answer a chat-completion request.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Vendor name used in logs and error messages.
    fn name(&self) -> &str;

    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, ReportError>;
}

// ── HTTP client ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: usize,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

/// OpenAI-compatible `chat/completions` client.
pub struct HttpChatClient {
    http: reqwest::Client,
    vendor: String,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpChatClient {
    pub fn new(
        vendor: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ReportError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            vendor: vendor.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    fn name(&self) -> &str {
        &self.vendor
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatReply, ReportError> {
        let start = Instant::now();
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReportError::ApiTimeout {
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    }
                } else {
                    ReportError::LlmApiError {
                        status: None,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(map_status(&self.vendor, status.as_u16(), retry_after_secs, text));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ReportError::MalformedResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                ReportError::MalformedResponse("no choices[0].message.content".to_string())
            })?;
        let usage = parsed.usage.unwrap_or_default();

        Ok(ChatReply {
            content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

fn map_status(vendor: &str, status: u16, retry_after_secs: Option<u64>, body: String) -> ReportError {
    match status {
        401 | 403 => ReportError::AuthError {
            provider: vendor.to_string(),
            detail: vendor_message(&body),
        },
        429 => ReportError::RateLimitExceeded {
            provider: vendor.to_string(),
            retry_after_secs,
        },
        _ => ReportError::LlmApiError {
            status: Some(status),
            message: vendor_message(&body),
        },
    }
}

/// Pull `error.message` out of a vendor error body, or fall back to the raw text.
fn vendor_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(500).collect())
}

// ── Client resolution ────────────────────────────────────────────────────────

/// Build the HTTP client described by `config`, reading keys from the
/// environment where the config leaves them unset.
pub fn resolve_client(config: &AnalysisConfig) -> Result<Arc<dyn ChatClient>, ReportError> {
    let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

    let vendor = detect_vendor(config, env)?;
    let api_key = config
        .api_key
        .clone()
        .or_else(|| env(vendor.api_key_env()))
        .ok_or_else(|| ReportError::ProviderNotConfigured {
            provider: vendor.name().to_string(),
            hint: format!("Set {} or pass --api-key.", vendor.api_key_env()),
        })?;
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| vendor.default_model().to_string());
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| vendor.base_url().to_string());

    info!("Using {} model '{}'", vendor, model);
    let client = HttpChatClient::new(vendor.name(), base_url, model, api_key, config.api_timeout_secs)?;
    Ok(Arc::new(client))
}

/// Pick a vendor, from most-specific to least-specific.
///
/// 1. `config.vendor`
/// 2. `DOCREPORT_VENDOR`
/// 3. whichever of `PERPLEXITY_API_KEY` / `OPENAI_API_KEY` is set, in that order
pub fn detect_vendor(
    config: &AnalysisConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Vendor, ReportError> {
    if let Some(vendor) = config.vendor {
        return Ok(vendor);
    }
    if let Some(name) = env("DOCREPORT_VENDOR") {
        return name.parse();
    }
    for vendor in [Vendor::Perplexity, Vendor::OpenAi] {
        if env(vendor.api_key_env()).is_some() {
            debug!("Auto-detected vendor {} from {}", vendor, vendor.api_key_env());
            return Ok(vendor);
        }
    }
    Err(ReportError::ProviderNotConfigured {
        provider: "auto".to_string(),
        hint: "Set PERPLEXITY_API_KEY or OPENAI_API_KEY, or choose a vendor with --vendor."
            .to_string(),
    })
}

// ── Report generation ────────────────────────────────────────────────────────

/// Raw vendor answer plus call statistics.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub markdown: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub retries: u32,
    pub truncated: bool,
    pub duration_ms: u64,
}

/// Ask the vendor for a Markdown report on `text`.
///
/// The request is `[system prompt, document message]`. Text longer than
/// `config.max_input_chars` is cut on a character boundary first.
pub async fn generate_report(
    client: &dyn ChatClient,
    file_name: &str,
    text: &str,
    config: &AnalysisConfig,
) -> Result<GeneratedReport, ReportError> {
    let start = Instant::now();
    let (text, truncated) = truncate_chars(text, config.max_input_chars);
    if truncated {
        warn!(
            "'{}': input truncated to {} characters",
            file_name, config.max_input_chars
        );
    }

    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(REPORT_SYSTEM_PROMPT);
    let request = ChatRequest {
        messages: vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(document_message(file_name, text)),
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let mut attempt: u32 = 0;
    loop {
        match client.complete(&request).await {
            Ok(reply) => {
                let duration = start.elapsed();
                debug!(
                    "'{}': {} input tokens, {} output tokens, {:?}",
                    file_name, reply.prompt_tokens, reply.completion_tokens, duration
                );
                return Ok(GeneratedReport {
                    markdown: reply.content,
                    prompt_tokens: reply.prompt_tokens,
                    completion_tokens: reply.completion_tokens,
                    retries: attempt,
                    truncated,
                    duration_ms: duration.as_millis() as u64,
                });
            }
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                attempt += 1;
                let backoff = backoff_for(&e, attempt, config.retry_backoff_ms);
                warn!(
                    "'{}': {} attempt {} failed ({}), retry {}/{} after {}ms",
                    file_name,
                    client.name(),
                    attempt,
                    e,
                    attempt,
                    config.max_retries,
                    backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => {
                warn!("'{}': {} call failed: {}", file_name, client.name(), e);
                return Err(e);
            }
        }
    }
}

fn backoff_for(err: &ReportError, attempt: u32, base_ms: u64) -> u64 {
    let exponential = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    match err {
        ReportError::RateLimitExceeded {
            retry_after_secs: Some(secs),
            ..
        } => exponential.max((*secs).min(MAX_RETRY_AFTER_SECS) * 1000),
        _ => exponential,
    }
}

/// Cut `text` to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}
