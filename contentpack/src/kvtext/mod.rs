//! Lightweight `key: value` descriptor parser.
//!
//! Auxiliary descriptor files use a richer, YAML-like format of which only the
//! flat top-level subset is understood here:
//!
//! ```text
//! # comment                  ← skipped
//! title: "Hello, World!"     ← title = Hello, World!
//! tags:                      ← tags = "" (nested block below is skipped)
//!   - one                    ← leading whitespace: unsupported, skipped
//! ```
//!
//! Parsed stores are immutable. [`KvStore::new`] creates a mutable store for
//! synthesizing descriptors in code.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Errors from key/value store mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    /// The store was produced by [`KvStore::parse`] and cannot be modified.
    #[error("cannot modify a parsed key/value store (key '{0}')")]
    Immutable(String),
}

/// A flat key/value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvStore {
    entries: BTreeMap<String, String>,
    mutable: bool,
}

impl KvStore {
    /// Create an empty, mutable store.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            mutable: true,
        }
    }

    /// Create a mutable store from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            mutable: true,
        }
    }

    /// Parse descriptor text into an immutable store.
    ///
    /// Later duplicates of a key replace earlier ones.
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();

        for (number, line) in text.lines().enumerate() {
            let nested = line.starts_with(char::is_whitespace);
            if nested || line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                tracing::debug!(line = number + 1, "Skipping descriptor line without ':'");
                continue;
            };

            let key = unquote(key.trim());
            if key.is_empty() {
                tracing::debug!(line = number + 1, "Skipping descriptor line with empty key");
                continue;
            }
            entries.insert(key.to_string(), unquote(value.trim()).to_string());
        }

        Self {
            entries,
            mutable: false,
        }
    }

    /// Whether [`insert`](Self::insert) is allowed.
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Insert or replace a value. Fails on parsed stores.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, KvError> {
        let key = key.into();
        if !self.mutable {
            return Err(KvError::Immutable(key));
        }
        Ok(self.entries.insert(key, value.into()))
    }

    /// Look up a key. Unknown keys yield an empty [`KvValue`].
    pub fn get(&self, key: &str) -> KvValue<'_> {
        KvValue(self.entries.get(key).map(String::as_str))
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KvStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders `key: value` lines that [`KvStore::parse`] reads back.
impl fmt::Display for KvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            if needs_quotes(value) {
                writeln!(f, "{}: \"{}\"", key, value)?;
            } else {
                writeln!(f, "{}: {}", key, value)?;
            }
        }
        Ok(())
    }
}

/// Typed accessor for a looked-up value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KvValue<'a>(Option<&'a str>);

impl<'a> KvValue<'a> {
    /// Whether the key was absent.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Raw value, if present.
    pub fn as_str(&self) -> Option<&'a str> {
        self.0
    }

    /// Value, or `default` if absent.
    pub fn as_str_or(&self, default: &'a str) -> &'a str {
        self.0.unwrap_or(default)
    }

    /// Value as an integer, or `default` if absent or not an integer.
    pub fn as_int_or(&self, default: i64) -> i64 {
        self.0
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Value as a float, or `default` if absent or not a number.
    pub fn as_float_or(&self, default: f64) -> f64 {
        self.0
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

fn needs_quotes(value: &str) -> bool {
    value != value.trim() || value.starts_with(['"', '\''])
}
