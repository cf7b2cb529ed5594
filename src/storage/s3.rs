//! AWS S3 digest store.
//!
//! The digest lives in a single object `s3://{bucket}/{key}` as plain text.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::models::ContentDigest;
use crate::storage::DigestStore;

/// S3-backed digest store.
#[derive(Clone)]
pub struct S3DigestStore {
    client: Client,
    bucket: String,
    key: String,
}

impl S3DigestStore {
    /// Create a new S3 digest store.
    pub fn new(client: Client, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create the store from environment configuration.
    ///
    /// `S3_BUCKET` names the bucket; `S3_KEY` overrides `default_key`.
    pub async fn from_env(default_key: &str) -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let bucket = std::env::var("S3_BUCKET")
            .map_err(|_| AppError::config("S3_BUCKET is not set"))?;
        let key = std::env::var("S3_KEY").unwrap_or_else(|_| default_key.to_string());

        Ok(Self::new(client, bucket, key))
    }
}

#[async_trait]
impl DigestStore for S3DigestStore {
    async fn load(&self) -> Result<ContentDigest> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(AppError::storage)?
                    .into_bytes();
                let content = String::from_utf8_lossy(&bytes);
                Ok(ContentDigest::from_stored(&content))
            }
            Err(err) => {
                // Check if it's a "not found" error
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::info!("No digest at {}, treating as first run", self.location());
                    Ok(ContentDigest::empty())
                } else {
                    Err(AppError::storage(service_err))
                }
            }
        }
    }

    async fn save(&self, digest: &ContentDigest) -> Result<()> {
        let body = ByteStream::from(digest.as_str().as_bytes().to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(body)
            .content_type("text/plain")
            .send()
            .await
            .map_err(AppError::storage)?;

        log::info!("Saved digest {} to {}", digest.short(), self.location());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(AppError::storage)?;

        log::info!("Deleted {}", self.location());
        Ok(())
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}
