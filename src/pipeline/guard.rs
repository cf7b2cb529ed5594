//! Content plausibility guard.
//!
//! Keeps a block page, an error page or a half-loaded document from being
//! hashed and persisted as if it were the real notice page.
//!
//! > If the normalized text is shorter than `min_content_length`, the run is
//! > aborted before hashing. Nothing is sent and nothing is persisted.

use crate::models::PageSnapshot;

/// Guard configuration.
#[derive(Debug, Clone)]
pub struct ContentGuardConfig {
    /// Minimum normalized text length in characters. Default: 100
    pub min_content_length: usize,
}

impl Default for ContentGuardConfig {
    fn default() -> Self {
        Self {
            min_content_length: 100,
        }
    }
}

/// Plausibility check for fetched snapshots.
#[derive(Debug, Clone)]
pub struct ContentGuard {
    config: ContentGuardConfig,
}

/// Result of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardResult {
    /// Long enough to be the real page
    Plausible { length: usize },
    /// Some text, but suspiciously little
    TooShort { length: usize, min_length: usize },
    /// No text at all
    Empty,
}

impl GuardResult {
    pub fn is_plausible(&self) -> bool {
        matches!(self, GuardResult::Plausible { .. })
    }
}

impl ContentGuard {
    /// Create a guard with default configuration.
    pub fn new() -> Self {
        Self::with_config(ContentGuardConfig::default())
    }

    /// Create a guard with custom configuration.
    pub fn with_config(config: ContentGuardConfig) -> Self {
        Self { config }
    }

    pub fn min_content_length(&self) -> usize {
        self.config.min_content_length
    }

    /// Classify a snapshot.
    pub fn check(&self, snapshot: &PageSnapshot) -> GuardResult {
        if snapshot.is_empty() {
            return GuardResult::Empty;
        }

        let length = snapshot.char_len();
        if length < self.config.min_content_length {
            return GuardResult::TooShort {
                length,
                min_length: self.config.min_content_length,
            };
        }

        GuardResult::Plausible { length }
    }
}

impl Default for ContentGuard {
    fn default() -> Self {
        Self::new()
    }
}
