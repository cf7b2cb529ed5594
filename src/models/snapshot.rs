//! Page snapshot and content digest.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Normalized plain text of the watched page at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    /// Normalized text (trimmed lines, no blank lines)
    pub text: String,

    /// Name of the fetch strategy that produced it
    pub strategy: String,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,
}

impl PageSnapshot {
    pub fn new(text: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            strategy: strategy.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Length in characters, the unit used by the plausibility guard.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Lowercase hex SHA-256 fingerprint of a snapshot.
///
/// The empty digest stands for "nothing persisted yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Digest of arbitrary text.
    pub fn of_text(text: &str) -> Self {
        Self(hex::encode(Sha256::digest(text.as_bytes())))
    }

    /// Digest of a snapshot's normalized text.
    pub fn of(snapshot: &PageSnapshot) -> Self {
        Self::of_text(&snapshot.text)
    }

    /// Wrap a stored value, trimming surrounding whitespace.
    pub fn from_stored(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for log lines.
    ///
    /// Stored values are not guaranteed to be hex, so this cuts on a char
    /// boundary.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<none>")
        } else {
            f.write_str(&self.0)
        }
    }
}
