//! Local filesystem digest store.
//!
//! ## Layout
//!
//! ```text
//! last_hash.txt      # 64 hex chars, no trailing newline
//! ```
//!
//! Writes go to `last_hash.tmp` first and are renamed into place, so an
//! interrupted run never leaves a half-written digest behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::ContentDigest;
use crate::storage::DigestStore;

/// File-backed digest store.
#[derive(Debug, Clone)]
pub struct LocalDigestStore {
    path: PathBuf,
}

impl LocalDigestStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read the file, returning None if it doesn't exist.
    async fn read_string(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl DigestStore for LocalDigestStore {
    async fn load(&self) -> Result<ContentDigest> {
        match self.read_string().await? {
            Some(content) => Ok(ContentDigest::from_stored(&content)),
            None => {
                log::info!("No digest at {}, treating as first run", self.path.display());
                Ok(ContentDigest::empty())
            }
        }
    }

    async fn save(&self, digest: &ContentDigest) -> Result<()> {
        self.write_bytes(digest.as_str().as_bytes()).await?;
        log::info!("Saved digest {} to {}", digest.short(), self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
