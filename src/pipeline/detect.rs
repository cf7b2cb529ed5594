//! Change detection.
//!
//! Compares the digest of the fresh snapshot with the last notified digest.
//! Pure: no I/O, no clock.

use crate::models::{ContentDigest, PageSnapshot};

/// Result of comparing a snapshot with the stored digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Same content as last notified
    Unchanged { digest: ContentDigest },
    /// New content; `first_run` when nothing was stored before
    Changed {
        digest: ContentDigest,
        first_run: bool,
    },
}

impl Change {
    pub fn is_changed(&self) -> bool {
        matches!(self, Change::Changed { .. })
    }

    pub fn digest(&self) -> &ContentDigest {
        match self {
            Change::Unchanged { digest } | Change::Changed { digest, .. } => digest,
        }
    }
}

/// Digest-based change detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Compare `snapshot` with the `previous` digest.
    pub fn detect(&self, snapshot: &PageSnapshot, previous: &ContentDigest) -> Change {
        let digest = ContentDigest::of(snapshot);
        if previous.is_empty() {
            return Change::Changed {
                digest,
                first_run: true,
            };
        }
        if &digest == previous {
            Change::Unchanged { digest }
        } else {
            Change::Changed {
                digest,
                first_run: false,
            }
        }
    }
}
