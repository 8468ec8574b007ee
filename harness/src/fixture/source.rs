//! Tabular fixture reading.
//!
//! # Format
//!
//! One row per line, comma-separated:
//!
//! ```text
//! Time,s1,s2,s3        <- optional header, skipped
//! # comment            <- skipped
//! 0,true,12,null
//! 1,null,13,hello
//! ```
//!
//! The first field is the timestamp (an `i64`), every further field belongs
//! to one declared column in order. The null token (default `null`) marks an
//! absent field. Fields are trimmed; fields cannot contain commas.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_NULL_TOKEN;

/// One raw fixture row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRow {
    /// 1-based line number in the fixture text.
    pub line: usize,
    pub timestamp: i64,
    /// One field per column; `None` is the null sentinel.
    pub fields: Vec<Option<String>>,
}

impl FixtureRow {
    /// Whether every field is null.
    #[must_use]
    pub fn is_all_null(&self) -> bool {
        self.fields.iter().all(Option::is_none)
    }
}

/// Errors produced while reading a fixture.
#[derive(Debug)]
pub enum FixtureError {
    /// The fixture file could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// The first field of a row is not an integer timestamp.
    MalformedTimestamp { line: usize, field: String },
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read fixture {}: {source}", path.display())
            }
            Self::MalformedTimestamp { line, field } => {
                write!(f, "line {line}: '{field}' is not a valid timestamp")
            }
        }
    }
}

impl std::error::Error for FixtureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::MalformedTimestamp { .. } => None,
        }
    }
}

/// A finite, restartable source of fixture rows.
///
/// The text is held in memory; each call to [`FixtureSource::rows`] starts a
/// new lazy pass over it.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    text: String,
    null_token: String,
}

impl FixtureSource {
    /// Create a source over in-memory text using the default null token.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            null_token: DEFAULT_NULL_TOKEN.to_string(),
        }
    }

    /// Read a fixture file.
    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("loaded fixture {} ({} bytes)", path.display(), text.len());
        Ok(Self::from_text(text))
    }

    /// Use a different null token.
    #[must_use]
    pub fn with_null_token(mut self, token: &str) -> Self {
        self.null_token = token.to_string();
        self
    }

    #[must_use]
    pub fn null_token(&self) -> &str {
        &self.null_token
    }

    /// Start a new pass over the rows.
    #[must_use]
    pub fn rows(&self) -> FixtureRows<'_> {
        FixtureRows {
            lines: self.text.lines().enumerate(),
            null_token: &self.null_token,
        }
    }
}

/// Lazy iterator over the rows of a [`FixtureSource`].
pub struct FixtureRows<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    null_token: &'a str,
}

impl Iterator for FixtureRows<'_> {
    type Item = Result<FixtureRow, FixtureError>;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, line) in self.lines.by_ref() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut fields = trimmed.split(',').map(str::trim);
            let first = fields.next().unwrap_or_default();
            if first.eq_ignore_ascii_case("time") {
                continue;
            }
            let line = index + 1;
            let Ok(timestamp) = first.parse::<i64>() else {
                return Some(Err(FixtureError::MalformedTimestamp {
                    line,
                    field: first.to_string(),
                }));
            };
            let fields = fields
                .map(|field| (field != self.null_token).then(|| field.to_string()))
                .collect();
            return Some(Ok(FixtureRow {
                line,
                timestamp,
                fields,
            }));
        }
        None
    }
}
