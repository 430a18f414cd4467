//! HTML input providers.
//!
//! The renderer accepts anything on stdin and happily produces a blank PDF
//! from plain text, so both providers refuse content that carries no markup
//! at all. That keeps "I passed a file path instead of its contents" mistakes
//! from turning into silently empty documents.

use crate::error::WkPdfError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info};

/// A tag opener: `<` not followed by whitespace. An unclosed tag runs to
/// the end of the text.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(?:\S|$)").unwrap());

/// Returns `true` if `text` would change when its tags were stripped.
///
/// Any `<` followed by a non-space character (or ending the text) opens a
/// tag, so `<3 cats` and `<unterminated` count as markup while `a < b`
/// does not.
pub fn contains_markup(text: &str) -> bool {
    TAG_RE.is_match(text)
}

/// Source of the HTML payload handed to the renderer.
pub trait HtmlInput {
    /// The HTML markup.
    ///
    /// # Errors
    /// [`WkPdfError::InputNotSet`] if no content was provided yet.
    fn html(&self) -> Result<&str, WkPdfError>;
}

// ── String input ─────────────────────────────────────────────────────────

/// HTML markup supplied directly as a string.
#[derive(Debug, Clone, Default)]
pub struct StringInput {
    html: Option<String>,
}

impl StringInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store `html` in one step.
    pub fn from_html(html: impl Into<String>) -> Result<Self, WkPdfError> {
        let mut input = Self::new();
        input.set_html(html)?;
        Ok(input)
    }

    /// Set the HTML markup.
    ///
    /// # Errors
    /// - [`WkPdfError::EmptyInput`] if `html` is empty
    /// - [`WkPdfError::NotHtml`] if `html` contains no tag
    pub fn set_html(&mut self, html: impl Into<String>) -> Result<(), WkPdfError> {
        let html = html.into();
        if html.is_empty() {
            return Err(WkPdfError::EmptyInput);
        }
        if !contains_markup(&html) {
            return Err(WkPdfError::NotHtml);
        }
        self.html = Some(html);
        Ok(())
    }
}

impl HtmlInput for StringInput {
    fn html(&self) -> Result<&str, WkPdfError> {
        self.html.as_deref().ok_or(WkPdfError::InputNotSet)
    }
}

// ── URL input ────────────────────────────────────────────────────────────

/// HTML markup fetched from an `http`/`https` URL.
#[derive(Debug, Clone)]
pub struct UrlInput {
    url: Option<reqwest::Url>,
    html: Option<String>,
    timeout_secs: u64,
}

impl Default for UrlInput {
    fn default() -> Self {
        Self {
            url: None,
            html: None,
            timeout_secs: 120,
        }
    }
}

impl UrlInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom fetch timeout (see
    /// [`crate::ConverterConfig::download_timeout_secs`]).
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        Self {
            timeout_secs: timeout_secs.max(1),
            ..Self::default()
        }
    }

    /// The URL whose body is currently held, if any.
    pub fn url(&self) -> Option<&str> {
        self.url.as_ref().map(|u| u.as_str())
    }

    /// Fetch `url` and keep its body as the HTML payload.
    ///
    /// The URL is validated before any network access.
    ///
    /// # Errors
    /// - [`WkPdfError::InvalidUrl`] for malformed or non-http(s) URLs
    /// - [`WkPdfError::DownloadFailed`] / [`WkPdfError::DownloadTimeout`]
    /// - [`WkPdfError::EmptyResponse`] if the body is empty
    /// - [`WkPdfError::NotHtml`] if the body contains no markup
    pub async fn set_url(&mut self, url: &str) -> Result<(), WkPdfError> {
        let parsed = parse_url(url)?;
        let body = fetch(&parsed, self.timeout_secs).await?;

        if body.is_empty() {
            return Err(WkPdfError::EmptyResponse {
                url: url.to_string(),
            });
        }
        if !contains_markup(&body) {
            return Err(WkPdfError::NotHtml);
        }

        debug!("Fetched {} bytes of HTML from {}", body.len(), parsed);
        self.url = Some(parsed);
        self.html = Some(body);
        Ok(())
    }

    /// Synchronous wrapper around [`UrlInput::set_url`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from
    /// inside an async context.
    pub fn set_url_blocking(&mut self, url: &str) -> Result<(), WkPdfError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| WkPdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.set_url(url))
    }
}

impl HtmlInput for UrlInput {
    fn html(&self) -> Result<&str, WkPdfError> {
        self.html.as_deref().ok_or(WkPdfError::InputNotSet)
    }
}

/// Parse and validate a URL without touching the network.
pub fn parse_url(url: &str) -> Result<reqwest::Url, WkPdfError> {
    let invalid = || WkPdfError::InvalidUrl {
        url: url.to_string(),
    };

    let parsed = reqwest::Url::parse(url.trim()).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid());
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }
    Ok(parsed)
}

async fn fetch(url: &reqwest::Url, timeout_secs: u64) -> Result<String, WkPdfError> {
    info!("Fetching HTML from: {}", url);

    let failed = |reason: String| WkPdfError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            WkPdfError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("wkpdf/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url.clone()).send().await.map_err(classify)?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    response.text().await.map_err(classify)
}
