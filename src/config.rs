//! Configuration types.
//!
//! [`AnalysisConfig`] holds every knob of the extract → LLM → layout
//! pipeline and is built through [`AnalysisConfigBuilder`]. [`ServerConfig`]
//! holds the HTTP-only settings and is read from the environment.

use crate::error::ReportError;
use crate::layout::PageGeometry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Default upload limit: 32 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Configuration for analysing one document.
///
/// Built via [`AnalysisConfig::builder()`] or [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use docreport::{AnalysisConfig, Vendor};
///
/// let config = AnalysisConfig::builder()
///     .vendor(Vendor::Perplexity)
///     .model("sonar")
///     .max_retries(1)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Chat-completion vendor. If None, detected from the environment.
    pub vendor: Option<Vendor>,

    /// Model identifier. If None, uses [`Vendor::default_model`].
    pub model: Option<String>,

    /// API key. If None, read from [`Vendor::api_key_env`].
    pub api_key: Option<String>,

    /// Override for the vendor base URL (proxies, compatible gateways).
    pub base_url: Option<String>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the vendor may generate. Default: 4096.
    pub max_tokens: usize,

    /// Retries on a transient vendor failure (429, 5xx, timeout). Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Custom system prompt. If None, uses [`crate::prompts::REPORT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Largest accepted document in bytes. Default: 32 MiB.
    pub max_upload_bytes: usize,

    /// Extracted text beyond this many characters is cut before the vendor
    /// call. Default: 120 000.
    pub max_input_chars: usize,

    /// Page geometry for PDF reports. Default: A4, 15 mm margin.
    pub geometry: PageGeometry,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            vendor: None,
            model: None,
            api_key: None,
            base_url: None,
            temperature: 0.2,
            max_tokens: 4096,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            system_prompt: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_input_chars: 120_000,
            geometry: PageGeometry::a4(),
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("vendor", &self.vendor)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("max_input_chars", &self.max_input_chars)
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn vendor(mut self, vendor: Vendor) -> Self {
        self.config.vendor = Some(vendor);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn geometry(mut self, geometry: PageGeometry) -> Self {
        self.config.geometry = geometry;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, ReportError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ReportError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.max_upload_bytes == 0 {
            return Err(ReportError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.max_input_chars == 0 {
            return Err(ReportError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ReportError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Vendor ───────────────────────────────────────────────────────────────────

/// OpenAI-compatible chat-completion vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    OpenAi,
    Perplexity,
}

impl Vendor {
    pub fn name(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "openai",
            Vendor::Perplexity => "perplexity",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "https://api.openai.com/v1",
            Vendor::Perplexity => "https://api.perplexity.ai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "gpt-4o-mini",
            Vendor::Perplexity => "sonar",
        }
    }

    /// Environment variable holding the vendor's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "OPENAI_API_KEY",
            Vendor::Perplexity => "PERPLEXITY_API_KEY",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Vendor {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Vendor::OpenAi),
            "perplexity" | "pplx" => Ok(Vendor::Perplexity),
            other => Err(ReportError::InvalidConfig(format!(
                "unknown vendor '{other}' (expected openai or perplexity)"
            ))),
        }
    }
}

// ── Server ───────────────────────────────────────────────────────────────────

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// SQLite connection string for feedback storage.
    pub database_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: "sqlite://docreport.db".to_string(),
        }
    }
}

impl ServerConfig {
    /// Read `DOCREPORT_BIND` and `DATABASE_URL`, falling back to defaults.
    pub fn from_env() -> Result<Self, ReportError> {
        let mut config = Self::default();
        if let Ok(bind) = std::env::var("DOCREPORT_BIND") {
            config.bind = bind.parse().map_err(|e| {
                ReportError::InvalidConfig(format!("DOCREPORT_BIND '{bind}': {e}"))
            })?;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                config.database_url = url;
            }
        }
        Ok(config)
    }
}
