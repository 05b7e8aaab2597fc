//! # docreport
//!
//! Turn laboratory documents into automation reports.
//!
//! A PDF, DOCX or plain-text protocol is reduced to text, sent to a
//! chat-completion vendor (OpenAI or Perplexity) with a fixed report prompt,
//! and the returned Markdown is cleaned up. The report can be served as
//! Markdown or laid out into pages and written as a PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Extract  PDF / DOCX / TXT → text (spawn_blocking)
//!  ├─ 2. LLM      chat/completions with retry + backoff
//!  ├─ 3. Polish   fence, list-marker and whitespace cleanup
//!  ├─ 4. Layout   Markdown subset → paginated draw instructions
//!  └─ 5. PDF      draw instructions → printpdf document
//! ```
//!
//! The layout engine ([`layout`]) is pure and total: it never fails and needs
//! no I/O, so it can be used on its own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docreport::{analyze_path, layout, AnalysisConfig};
//! use docreport::pipeline::llm::resolve_client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Vendor auto-detected from PERPLEXITY_API_KEY / OPENAI_API_KEY
//!     let config = AnalysisConfig::default();
//!     let client = resolve_client(&config)?;
//!     let output = analyze_path(client.as_ref(), &config, "protocol.docx").await?;
//!
//!     let pages = layout::render(
//!         &layout::Document::from_markdown(&output.markdown),
//!         &config.geometry,
//!     );
//!     eprintln!("{} pages", pages.page_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docreport` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docreport = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod content;
pub mod error;
pub mod feedback;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_path, analyze_upload, render_report_pdf, write_atomically};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ServerConfig, Vendor};
pub use error::ReportError;
pub use feedback::{Feedback, FeedbackStore, MemoryFeedbackStore, NewFeedback, SqliteFeedbackStore};
pub use layout::{render, Document, DrawInstruction, Page, PageGeometry, RenderResult, TextRun};
pub use output::{AnalysisOutput, AnalysisStats};
