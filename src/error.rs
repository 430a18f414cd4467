//! Error type for the wkpdf library.
//!
//! Every failure is fatal for the conversion that hit it: there is no partial
//! success, so a single [`WkPdfError`] enum covers the whole pipeline. Its
//! variants are grouped by the stage that raises them, which lets callers
//! match on a section (say, every execution failure) without string parsing.

use std::path::PathBuf;
use thiserror::Error;
use wkhtmltopdf_locate::LocateError;

/// All errors returned by the wkpdf library.
#[derive(Debug, Error)]
pub enum WkPdfError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// Option key was empty (or whitespace only).
    #[error("Option key must not be empty")]
    InvalidOptionKey,

    /// Option key was given with its `-`/`--` prefix.
    #[error("Provide option '{key}' without prefix, e.g. 'margin-top' instead of '--margin-top'")]
    PrefixedOptionKey { key: String },

    /// A bulk option update was empty or malformed.
    #[error("Provided options are invalid: {0}")]
    InvalidOptions(String),

    /// `option()` was asked for a key that was never set.
    #[error("Option '{key}' has not been set")]
    OptionNotSet { key: String },

    /// HTML input was empty.
    #[error("Input is empty")]
    EmptyInput,

    /// Input contains no markup tag at all.
    #[error("Input must be valid HTML markup")]
    NotHtml,

    /// `html()` was called before any content was set.
    #[error("Input has not yet been set")]
    InputNotSet,

    /// URL is malformed or uses a scheme that cannot be fetched.
    #[error("Input is not a valid URL: '{url}'\nUse an absolute http:// or https:// URL.")]
    InvalidUrl { url: String },

    /// Host cannot run the renderer.
    #[error("wkpdf requires {0}")]
    UnsupportedPlatform(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input fetch errors ────────────────────────────────────────────────
    /// URL was syntactically valid but the fetch failed.
    #[error("Could not fetch URL '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Fetch exceeded the configured timeout.
    #[error("Fetching '{url}' timed out after {secs}s")]
    DownloadTimeout { url: String, secs: u64 },

    /// Fetch succeeded but the body was empty.
    #[error("URL '{url}' returned an empty body")]
    EmptyResponse { url: String },

    // ── Resolution errors ─────────────────────────────────────────────────
    /// Renderer binary is missing from every candidate location.
    #[error(
        "{0}\n\n\
Install wkhtmltopdf, or point WKHTMLTOPDF_PATH at an existing copy.\n"
    )]
    BinaryNotFound(#[from] LocateError),

    // ── Execution errors ──────────────────────────────────────────────────
    /// The renderer process could not be started.
    #[error("Failed to start renderer '{path}': {source}")]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The renderer reported an error on its diagnostic stream.
    #[error("Binary error: {stderr}")]
    BinaryError { stderr: String },

    /// The renderer exited with a failure code (> 1).
    #[error("Shell error: renderer exited with code {code}")]
    ShellError { code: i32 },

    /// The renderer exited cleanly but wrote nothing to stdout.
    #[error("No data returned by the renderer")]
    NoData,

    /// The renderer ran longer than the configured process timeout.
    #[error("Renderer timed out after {secs}s and was killed")]
    RendererTimeout { secs: u64 },

    // ── Sink errors ───────────────────────────────────────────────────────
    /// Output was read before a conversion handed it any data.
    #[error("PDF data has not yet been set")]
    PdfDataNotSet,

    /// Output already holds the data of a previous conversion.
    #[error("PDF data has already been set")]
    PdfDataAlreadySet,

    /// Target directory is missing or read-only.
    #[error("Output directory '{path}' is not writable")]
    DirectoryNotWritable { path: PathBuf },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP headers for this response were already emitted.
    #[error("Headers have already been sent")]
    HeadersAlreadySent,

    /// Download/inline response needs a filename.
    #[error("Filename must not be empty")]
    MissingFilename,

    /// Writing the HTTP response failed.
    #[error("Failed to write response: {0}")]
    ResponseWriteFailed(#[source] std::io::Error),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WkPdfError {
    /// `true` for failures reported by the renderer run itself.
    pub fn is_execution_error(&self) -> bool {
        matches!(
            self,
            WkPdfError::SpawnFailed { .. }
                | WkPdfError::BinaryError { .. }
                | WkPdfError::ShellError { .. }
                | WkPdfError::NoData
                | WkPdfError::RendererTimeout { .. }
        )
    }
}
