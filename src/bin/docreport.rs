//! CLI binary for docreport.
//!
//! A thin shim over the library crate: `serve` runs the HTTP surface,
//! `analyze` runs one document through the pipeline, `render` lays out an
//! existing Markdown report as a PDF without calling a vendor.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docreport::analyze::report_pdf;
use docreport::pipeline::llm::resolve_client;
use docreport::server::{self, AppState};
use docreport::{
    analyze_path, layout, write_atomically, AnalysisConfig, FeedbackStore, MemoryFeedbackStore,
    PageGeometry, ServerConfig, SqliteFeedbackStore, Vendor,
};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the HTTP server on 0.0.0.0:3000
  docreport serve

  # Analyse a protocol and print the Markdown report
  docreport analyze protocol.docx

  # Analyse a remote PDF and write the report as a PDF
  docreport analyze https://example.org/sop.pdf --pdf -o sop-analysis.pdf

  # Lay out an existing Markdown report (no API key needed)
  docreport render report.md -o report.pdf

  # Inspect the page layout as JSON
  docreport render report.md --layout-json

ENVIRONMENT VARIABLES:
  PERPLEXITY_API_KEY       Perplexity API key
  OPENAI_API_KEY           OpenAI API key
  DOCREPORT_VENDOR         Override vendor (perplexity, openai)
  DOCREPORT_MODEL          Override model ID
  DOCREPORT_BIND           Server listen address (default 0.0.0.0:3000)
  DATABASE_URL             Feedback database (default sqlite://docreport.db)
  DOCREPORT_MAX_UPLOAD_MB  Upload limit in MiB (default 32)

A .env file in the working directory is read before arguments are parsed.
"#;

/// Turn laboratory documents into automation reports.
#[derive(Parser, Debug)]
#[command(
    name = "docreport",
    version,
    about = "Turn laboratory documents into LLM-written automation reports",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCREPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCREPORT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Listen address. Default: DOCREPORT_BIND or 0.0.0.0:3000.
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// SQLite URL for feedback. Default: DATABASE_URL or sqlite://docreport.db.
        #[arg(long)]
        database_url: Option<String>,

        /// Keep feedback in memory instead of SQLite.
        #[arg(long)]
        no_db: bool,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Analyse one document (local path or HTTP/HTTPS URL).
    Analyze {
        /// Local .pdf / .docx / .txt file or URL.
        input: String,

        /// Write the report to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a laid-out PDF instead of Markdown (requires --output).
        #[arg(long, requires = "output")]
        pdf: bool,

        /// Print the full result (report + stats) as JSON.
        #[arg(long, conflicts_with = "pdf")]
        json: bool,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Lay out a Markdown report as a PDF.
    Render {
        /// Markdown file, or `-` for stdin.
        input: String,

        /// PDF output path.
        #[arg(short, long, required_unless_present = "layout_json")]
        output: Option<PathBuf>,

        /// Print the draw instructions as JSON instead of writing a PDF.
        #[arg(long)]
        layout_json: bool,

        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct LlmArgs {
    /// Chat vendor: perplexity or openai. Auto-detected from API keys if unset.
    #[arg(long, env = "DOCREPORT_VENDOR")]
    vendor: Option<Vendor>,

    /// Model ID. Default: sonar (perplexity) or gpt-4o-mini (openai).
    #[arg(long, env = "DOCREPORT_MODEL")]
    model: Option<String>,

    /// Override the vendor base URL (OpenAI-compatible gateways).
    #[arg(long, env = "DOCREPORT_BASE_URL")]
    base_url: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "DOCREPORT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOCREPORT_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "DOCREPORT_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Retries on transient LLM failures.
    #[arg(long, env = "DOCREPORT_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// LLM call timeout in seconds.
    #[arg(long, env = "DOCREPORT_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Largest accepted document in MiB.
    #[arg(long, env = "DOCREPORT_MAX_UPLOAD_MB", default_value_t = 32)]
    max_upload_mb: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOCREPORT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Args, Debug, Clone)]
struct PageArgs {
    /// Page width in millimetres.
    #[arg(long, default_value_t = 210.0)]
    page_width: f32,

    /// Page height in millimetres.
    #[arg(long, default_value_t = 297.0)]
    page_height: f32,

    /// Page margin in millimetres.
    #[arg(long, default_value_t = 15.0)]
    margin: f32,
}

impl PageArgs {
    fn geometry(&self) -> Result<PageGeometry> {
        PageGeometry::new(self.page_width, self.page_height, self.margin)
            .context("Invalid page geometry")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            bind,
            database_url,
            no_db,
            llm,
            page,
        } => {
            let mut server_config = ServerConfig::from_env()?;
            if let Some(bind) = bind {
                server_config.bind = bind;
            }
            if let Some(url) = database_url {
                server_config.database_url = url;
            }

            let config = build_config(&llm, &page).await?;
            let chat = match resolve_client(&config) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::warn!("{e}\n/parse will answer 503 until a vendor is configured.");
                    None
                }
            };
            let feedback: Arc<dyn FeedbackStore> = if no_db {
                Arc::new(MemoryFeedbackStore::new())
            } else {
                Arc::new(
                    SqliteFeedbackStore::connect(&server_config.database_url)
                        .await
                        .context("Failed to open feedback database")?,
                )
            };

            server::serve(&server_config, AppState::new(config, chat, feedback)).await?;
        }

        Command::Analyze {
            input,
            output,
            pdf,
            json,
            llm,
            page,
        } => {
            let config = build_config(&llm, &page).await?;
            let client = resolve_client(&config)?;
            let result = analyze_path(client.as_ref(), &config, &input)
                .await
                .context("Analysis failed")?;

            if json {
                let body =
                    serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
                emit(output.as_ref(), body.as_bytes()).await?;
            } else if pdf {
                let bytes = report_pdf(&result.markdown, &config.geometry);
                emit(output.as_ref(), &bytes).await?;
            } else {
                emit(output.as_ref(), result.markdown.as_bytes()).await?;
            }

            if !cli.quiet {
                eprintln!(
                    "{}  {}  {}ms  {} tokens in / {} out",
                    green("✔"),
                    bold(&result.file_name),
                    result.stats.total_ms,
                    dim(&result.stats.prompt_tokens.to_string()),
                    dim(&result.stats.completion_tokens.to_string()),
                );
            }
        }

        Command::Render {
            input,
            output,
            layout_json,
            page,
        } => {
            let geometry = page.geometry()?;
            let markdown = read_markdown(&input)?;

            if layout_json {
                let laid_out = layout::render(&layout::Document::from_markdown(&markdown), &geometry);
                let body = serde_json::to_string_pretty(&laid_out)
                    .context("Failed to serialise layout")?;
                emit(output.as_ref(), body.as_bytes()).await?;
            } else {
                let bytes = report_pdf(&markdown, &geometry);
                emit(output.as_ref(), &bytes).await?;
                if !cli.quiet {
                    if let Some(path) = &output {
                        eprintln!("{}  {}", green("✔"), bold(&path.display().to_string()));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(llm: &LlmArgs, page: &PageArgs) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .temperature(llm.temperature)
        .max_tokens(llm.max_tokens)
        .max_retries(llm.max_retries)
        .api_timeout_secs(llm.api_timeout)
        .max_upload_bytes(llm.max_upload_mb.saturating_mul(1024 * 1024))
        .download_timeout_secs(llm.download_timeout)
        .geometry(page.geometry()?);

    if let Some(vendor) = llm.vendor {
        builder = builder.vendor(vendor);
    }
    if let Some(ref model) = llm.model {
        builder = builder.model(model);
    }
    if let Some(ref url) = llm.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref path) = llm.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

fn read_markdown(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read Markdown from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
    }
}

/// Write to `path` atomically, or to stdout when no path is given.
async fn emit(path: Option<&PathBuf>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => write_atomically(path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => write_terminated(&mut io::stdout().lock(), bytes)
            .context("Failed to write to stdout"),
    }
}

/// Write `bytes`, adding a trailing newline when missing.
fn write_terminated(out: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    out.write_all(bytes)?;
    if !bytes.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    out.flush()
}
