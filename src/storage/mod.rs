//! Storage abstractions for the last notified digest.
//!
//! The digest is the only durable state. It is written only after a change
//! notification was confirmed, so a failed delivery is retried next run.
//!
//! - `LocalDigestStore`: one-line text file (`last_hash.txt`)
//! - `S3DigestStore`: one S3 object (feature `s3`)

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ContentDigest;

// Re-export for convenience
pub use local::LocalDigestStore;
#[cfg(feature = "s3")]
pub use s3::S3DigestStore;

/// Trait for digest storage backends.
#[async_trait]
pub trait DigestStore: Send + Sync {
    /// Load the last notified digest; an absent value is the empty digest.
    async fn load(&self) -> Result<ContentDigest>;

    /// Replace the stored digest.
    async fn save(&self, digest: &ContentDigest) -> Result<()>;

    /// Forget the stored digest so the next run reports a change.
    async fn clear(&self) -> Result<()>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}
