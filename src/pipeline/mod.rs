//! Pipeline stages for document analysis.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ postprocess ──▶ layout ──▶ pdf
//! (path/URL) (text)    (chat)   (cleanup)       (pages)    (bytes)
//! ```
//!
//! 1. [`input`]  : read a local path or download a URL (CLI only; the HTTP
//!    surface receives bytes directly)
//! 2. [`extract`]: PDF / DOCX / TXT to plain text; runs in `spawn_blocking`
//! 3. [`llm`]    : chat-completion call with retry/backoff; the only stage
//!    with vendor network I/O
//! 4. [`postprocess`]: deterministic cleanup of the returned Markdown
//! 5. [`crate::layout`]: pagination into draw instructions
//! 6. [`pdf`]    : serialise the pages with `printpdf`

pub mod extract;
pub mod input;
pub mod llm;
pub mod pdf;
pub mod postprocess;
