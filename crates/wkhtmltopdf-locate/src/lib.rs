//! # wkhtmltopdf-locate
//!
//! Find the [wkhtmltopdf](https://wkhtmltopdf.org/) renderer binary on the
//! host, so that callers of `wkpdf` never have to hard-code where the
//! executable was installed.
//!
//! ## How it works
//!
//! On a call to [`locate`] or [`locate_in`]:
//!
//! 1. Asks `uname -m` whether the host CPU is 64-bit and picks the matching
//!    bundled variant (`wkhtmltopdf-amd64` or `wkhtmltopdf-i386`).
//! 2. Builds an ordered list of candidate install locations
//!    (see [`candidate_paths`]).
//! 3. Returns the first candidate that exists on disk, or
//!    [`LocateError::BinaryNotFound`] listing every probed path.
//!
//! The binary is only ever located. Nothing is downloaded or built.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wkhtmltopdf_locate::{locate, locate_in, detect_variant};
//! use std::path::PathBuf;
//!
//! // Option A: default search locations
//! let renderer = locate().expect("wkhtmltopdf unavailable");
//!
//! // Option B: also probe a project-local vendor directory first
//! let roots = [PathBuf::from("/srv/app/vendor")];
//! let renderer = locate_in(&roots).expect("wkhtmltopdf unavailable");
//! println!("{} ({:?})", renderer.display(), detect_variant());
//! ```
//!
//! ## Candidate layout
//!
//! | Variant | Relative path under a search root                     |
//! |---------|-------------------------------------------------------|
//! | amd64   | `h4cc/wkhtmltopdf-amd64/bin/wkhtmltopdf-amd64`        |
//! | i386    | `h4cc/wkhtmltopdf-i386/bin/wkhtmltopdf-i386`          |
//!
//! ## Environment variable overrides
//!
//! - `WKHTMLTOPDF_PATH`: path to an existing renderer; probed first.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::debug;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable naming an explicit renderer path.
pub const ENV_BINARY_PATH: &str = "WKHTMLTOPDF_PATH";

/// Name of the renderer when installed system-wide (e.g. by a distro package).
pub const SYSTEM_BINARY_NAME: &str = "wkhtmltopdf";

/// Vendor package directory that ships the bundled variants.
const VENDOR_PACKAGE: &str = "h4cc";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by wkhtmltopdf-locate operations.
#[derive(Error, Debug)]
pub enum LocateError {
    /// None of the candidate locations holds a renderer binary.
    #[error("wkhtmltopdf binary could not be found (variant {variant}); probed: {}", format_probed(.probed))]
    BinaryNotFound {
        variant: Variant,
        probed: Vec<PathBuf>,
    },
}

fn format_probed(probed: &[PathBuf]) -> String {
    probed
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Architecture variants ────────────────────────────────────────────────────

/// The two bundled renderer builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// 64-bit build (`wkhtmltopdf-amd64`).
    Amd64,
    /// 32-bit build (`wkhtmltopdf-i386`).
    I386,
}

impl Variant {
    /// Variant suffix used in package and file names.
    pub fn suffix(self) -> &'static str {
        match self {
            Variant::Amd64 => "amd64",
            Variant::I386 => "i386",
        }
    }

    /// File name of the bundled binary, e.g. `wkhtmltopdf-amd64`.
    pub fn binary_name(self) -> String {
        format!("{SYSTEM_BINARY_NAME}-{}", self.suffix())
    }

    /// Path of the binary relative to a vendor search root.
    pub fn vendor_relative_path(self) -> PathBuf {
        let name = self.binary_name();
        Path::new(VENDOR_PACKAGE).join(&name).join("bin").join(name)
    }

    /// Pick the variant for an architecture string such as
    /// `std::env::consts::ARCH`. Anything mentioning `64` is treated as 64-bit.
    pub fn for_arch(arch: &str) -> Self {
        if arch.contains("64") {
            Variant::Amd64
        } else {
            Variant::I386
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Detect the variant matching the host CPU.
///
/// Asks the kernel via `uname -m`, so a 32-bit build running on a 64-bit
/// host still picks [`Variant::Amd64`]. Falls back to the compile target
/// (`std::env::consts::ARCH`) when `uname` is unavailable.
pub fn detect_variant() -> Variant {
    Variant::for_arch(host_arch().unwrap_or(std::env::consts::ARCH))
}

/// Machine hardware name reported by `uname -m`, e.g. `x86_64`.
///
/// Queried once per process.
pub fn host_arch() -> Option<&'static str> {
    static HOST_ARCH: OnceLock<Option<String>> = OnceLock::new();
    HOST_ARCH.get_or_init(query_uname).as_deref()
}

fn query_uname() -> Option<String> {
    let output = Command::new("uname").arg("-m").output().ok()?;
    if !output.status.success() {
        debug!("uname -m exited with {}", output.status);
        return None;
    }
    let arch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    debug!("Host architecture: {}", arch);
    (!arch.is_empty()).then_some(arch)
}

// ── Per-user install directory ───────────────────────────────────────────────

/// Returns the per-user directory where a renderer may be installed.
///
/// Default locations:
/// - **macOS**: `~/Library/Application Support/wkpdf/bin/`
/// - **Linux**: `~/.local/share/wkpdf/bin/`
pub fn user_bin_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("wkpdf").join("bin")
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Ordered list of locations probed for the renderer.
///
/// 1. `$WKHTMLTOPDF_PATH`, when set
/// 2. each of `extra_roots` joined with [`Variant::vendor_relative_path`]
/// 3. `./vendor/` joined with the same relative path
/// 4. [`user_bin_dir`] joined with [`Variant::binary_name`]
/// 5. `wkhtmltopdf` in every `PATH` entry
pub fn candidate_paths(variant: Variant, extra_roots: &[PathBuf]) -> Vec<PathBuf> {
    build_candidates(
        variant,
        extra_roots,
        std::env::var_os(ENV_BINARY_PATH),
        std::env::var_os("PATH"),
    )
}

/// Locate the renderer in the default locations.
///
/// The result is cached for the lifetime of the process.
pub fn locate() -> Result<PathBuf, LocateError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let path = locate_in(&[])?;

    // Ignore the race; every thread resolved the same path.
    let _ = RESOLVED_PATH.set(path.clone());

    Ok(path)
}

/// Locate the renderer, probing `extra_roots` before the default locations.
///
/// Never cached: the roots may differ between calls.
pub fn locate_in(extra_roots: &[PathBuf]) -> Result<PathBuf, LocateError> {
    let variant = detect_variant();
    let candidates = candidate_paths(variant, extra_roots);
    first_existing(variant, candidates)
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn build_candidates(
    variant: Variant,
    extra_roots: &[PathBuf],
    env_override: Option<OsString>,
    path_var: Option<OsString>,
) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(p) = env_override.filter(|p| !p.is_empty()) {
        candidates.push(PathBuf::from(p));
    }

    let relative = variant.vendor_relative_path();
    candidates.extend(extra_roots.iter().map(|root| root.join(&relative)));
    candidates.push(Path::new("vendor").join(&relative));
    candidates.push(user_bin_dir().join(variant.binary_name()));

    if let Some(path_var) = path_var {
        candidates.extend(std::env::split_paths(&path_var).map(|dir| dir.join(SYSTEM_BINARY_NAME)));
    }

    candidates
}

fn first_existing(variant: Variant, candidates: Vec<PathBuf>) -> Result<PathBuf, LocateError> {
    for candidate in &candidates {
        debug!("Probing renderer candidate: {}", candidate.display());
        if candidate.is_file() {
            debug!("Renderer found: {}", candidate.display());
            return Ok(candidate.clone());
        }
    }

    Err(LocateError::BinaryNotFound {
        variant,
        probed: candidates,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
