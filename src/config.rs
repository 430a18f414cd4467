//! Converter configuration.
//!
//! Everything that is not a renderer option lives in [`ConverterConfig`]:
//! where to find the binary, how long to wait for URL fetches, and whether
//! to bound the renderer's run time. Renderer flags themselves belong in
//! [`crate::options::Options`].

use crate::error::WkPdfError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`crate::Converter`].
///
/// Built via [`ConverterConfig::builder()`] or using
/// [`ConverterConfig::default()`].
///
/// # Example
/// ```rust
/// use wkpdf::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .binary_path("/usr/local/bin/wkhtmltopdf")
///     .timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Explicit renderer path. Skips discovery entirely when set.
    pub binary_path: Option<PathBuf>,

    /// Extra vendor roots probed before the default locations.
    ///
    /// Each root is expected to contain
    /// `h4cc/wkhtmltopdf-{amd64,i386}/bin/wkhtmltopdf-{amd64,i386}`.
    pub search_roots: Vec<PathBuf>,

    /// Timeout for [`crate::UrlInput`] fetches in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Upper bound on a single renderer run in seconds. Default: none.
    ///
    /// Without a bound a hung renderer blocks the caller indefinitely.
    /// When set, the child is killed once the limit passes and the
    /// conversion fails with [`WkPdfError::RendererTimeout`].
    pub timeout_secs: Option<u64>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            search_roots: Vec::new(),
            download_timeout_secs: 120,
            timeout_secs: None,
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Process timeout as a [`Duration`].
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.binary_path = Some(path.into());
        self
    }

    pub fn search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.search_roots.push(root.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, WkPdfError> {
        let c = &self.config;
        if c.download_timeout_secs == 0 {
            return Err(WkPdfError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.timeout_secs == Some(0) {
            return Err(WkPdfError::InvalidConfig(
                "Renderer timeout must be ≥ 1 second".into(),
            ));
        }
        if c.binary_path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(WkPdfError::InvalidConfig(
                "Binary path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_wait_forever() {
        let c = ConverterConfig::default();
        assert!(c.timeout().is_none());
        assert_eq!(c.download_timeout_secs, 120);
        assert!(c.binary_path.is_none());
    }

    #[test]
    fn builder_rejects_zero_timeouts() {
        assert!(ConverterConfig::builder().timeout_secs(0).build().is_err());
        assert!(ConverterConfig::builder()
            .download_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn builder_collects_search_roots_in_order() {
        let c = ConverterConfig::builder()
            .search_root("/a")
            .search_root("/b")
            .build()
            .unwrap();
        assert_eq!(c.search_roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn config_serialises() {
        let c = ConverterConfig::builder().timeout_secs(5).build().unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"timeout_secs\":5"), "got: {json}");
    }
}
