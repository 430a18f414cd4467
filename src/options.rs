//! Ordered store of renderer command-line options.
//!
//! Keys are stored without their dash prefix; the prefix is chosen later by
//! [`crate::command`] from the key length. Insertion order is kept because
//! wkhtmltopdf treats some options positionally (page/cover sections), so
//! the command line must list them exactly as the caller added them.

use crate::error::WkPdfError;
use serde_json::Value;
use std::fmt;

/// Prefix character that must never start a stored key.
pub const SHORT_PREFIX: char = '-';

/// One entry of a bulk option update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionEntry {
    /// `name → value`
    Keyed(String, String),
    /// Flag-only option, stored as `name → ""`.
    Flag(String),
}

impl From<&str> for OptionEntry {
    fn from(name: &str) -> Self {
        OptionEntry::Flag(name.to_string())
    }
}

impl From<String> for OptionEntry {
    fn from(name: String) -> Self {
        OptionEntry::Flag(name)
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for OptionEntry {
    fn from((key, value): (K, V)) -> Self {
        OptionEntry::Keyed(key.into(), value.into())
    }
}

/// Insertion-ordered map of option name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    entries: Vec<(String, String)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single option, replacing the value in place if the key exists.
    ///
    /// # Errors
    /// - [`WkPdfError::InvalidOptionKey`] if `key` is empty
    /// - [`WkPdfError::PrefixedOptionKey`] if `key` starts with `-`
    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Result<&mut Self, WkPdfError> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(WkPdfError::InvalidOptionKey);
        }
        if key.starts_with(SHORT_PREFIX) {
            return Err(WkPdfError::PrefixedOptionKey {
                key: key.to_string(),
            });
        }

        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key.to_string(), value)),
        }
        Ok(self)
    }

    /// Set a flag-only option.
    pub fn set_flag(&mut self, key: impl AsRef<str>) -> Result<&mut Self, WkPdfError> {
        self.set(key, String::new())
    }

    /// Set many options at once, in iteration order.
    ///
    /// Stops at the first invalid entry; entries before it stay applied.
    ///
    /// # Errors
    /// [`WkPdfError::InvalidOptions`] if `entries` is empty, otherwise
    /// whatever [`Options::set`] reports for the offending entry.
    pub fn extend<I, E>(&mut self, entries: I) -> Result<&mut Self, WkPdfError>
    where
        I: IntoIterator<Item = E>,
        E: Into<OptionEntry>,
    {
        let mut any = false;
        for entry in entries {
            any = true;
            match entry.into() {
                OptionEntry::Keyed(key, value) => self.set(key, value)?,
                OptionEntry::Flag(key) => self.set_flag(key)?,
            };
        }
        if !any {
            return Err(WkPdfError::InvalidOptions("no options given".into()));
        }
        Ok(self)
    }

    /// Parse a JSON object of option name to value, keeping document order.
    ///
    /// Strings and numbers become values, `true` and `null` become flags,
    /// `false` leaves the option out.
    ///
    /// ```rust
    /// use wkpdf::Options;
    ///
    /// let o = Options::from_json(r#"{"margin-top": 10, "grayscale": true}"#).unwrap();
    /// assert_eq!(o.to_string(), "margin-top=10, grayscale");
    /// ```
    pub fn from_json(json: &str) -> Result<Self, WkPdfError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| WkPdfError::InvalidOptions(format!("not valid JSON: {e}")))?;
        let Value::Object(map) = value else {
            return Err(WkPdfError::InvalidOptions("expected a JSON object".into()));
        };

        let mut options = Self::new();
        for (key, value) in map {
            match value {
                Value::String(s) => options.set(&key, s)?,
                Value::Number(n) => options.set(&key, n.to_string())?,
                Value::Bool(true) | Value::Null => options.set_flag(&key)?,
                Value::Bool(false) => continue,
                other => {
                    return Err(WkPdfError::InvalidOptions(format!(
                        "option '{key}' has unsupported value {other}"
                    )))
                }
            };
        }
        Ok(options)
    }

    /// Value of a single option. `key` is trimmed like in [`Options::set`].
    pub fn get(&self, key: &str) -> Result<&str, WkPdfError> {
        self.position(key)
            .map(|idx| self.entries[idx].1.as_str())
            .ok_or_else(|| WkPdfError::OptionNotSet {
                key: key.trim().to_string(),
            })
    }

    /// Remove an option, returning its value if it was set.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.position(key)?;
        Some(self.entries.remove(idx).1)
    }

    fn position(&self, key: &str) -> Option<usize> {
        let key = key.trim();
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// All options in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            if v.is_empty() {
                write!(f, "{k}")?;
            } else {
                write!(f, "{k}={v}")?;
            }
        }
        Ok(())
    }
}
