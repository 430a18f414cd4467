//! # wkpdf
//!
//! Convert HTML to PDF by driving a pre-built `wkhtmltopdf` executable.
//!
//! ## Pipeline Overview
//!
//! ```text
//! HTML
//!  │
//!  ├─ 1. Input    markup string, or body fetched from an http(s) URL
//!  ├─ 2. Options  ordered renderer flags (`margin-top=10`, `grayscale`, …)
//!  ├─ 3. Locate   WKHTMLTOPDF_PATH, vendor roots, PATH
//!  ├─ 4. Execute  HTML on stdin, PDF on stdout, diagnostics on stderr
//!  ├─ 5. Verdict  stderr / exit code / empty output checks
//!  └─ 6. Output   bytes in memory, a file, or an HTTP download/inline response
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wkpdf::{Converter, FileOutput, UrlInput};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut input = UrlInput::new();
//!     input.set_url("https://example.com/").await?;
//!
//!     let converter = Converter::with_options(
//!         input,
//!         FileOutput::new(),
//!         [("margin-top", "10"), ("page-size", "A4")],
//!     )?;
//!
//!     let output = converter.convert().await?;
//!     output.store("/tmp/example.pdf")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `wkpdf` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! wkpdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod input;
pub mod options;
pub mod output;
pub mod process;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use command::RenderCommand;
pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use convert::{interpret, Converter};
pub use error::WkPdfError;
pub use input::{HtmlInput, StringInput, UrlInput};
pub use options::{OptionEntry, Options};
pub use output::{DownloadOutput, EmbedOutput, FileOutput, HttpResponse, PdfOutput, StringOutput};
pub use process::{check_requirements, ExecutionResult};
