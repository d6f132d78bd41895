//! Amazon S3 storage backend (requires the `s3` feature).

use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::Error;
use crate::storage::MediaStorage;

/// Storage backend that keeps media in an S3 (or S3-compatible) bucket.
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }

    /// Create an `S3Storage` using credentials and region from the AWS
    /// environment (env vars, config files, IMDS, etc.).
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::new(Client::new(&config), bucket)
    }
}

#[async_trait]
impl MediaStorage for S3Storage {
    fn is_remote(&self) -> bool {
        true
    }

    async fn exists(&self, key: &str) -> Result<bool, Error> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(Error::Storage(format!("s3://{}/{key}: {e}", self.bucket))),
        }
    }

    async fn read(&self, key: &str) -> Result<Bytes, Error> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("s3://{}/{key}: {e}", self.bucket)))?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| Error::Storage(format!("s3://{}/{key}: {e}", self.bucket)))?;

        Ok(data.into_bytes())
    }

    async fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<(), Error> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(content.to_vec().into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("s3://{}/{key}: {e}", self.bucket)))?;

        tracing::debug!("uploaded {} bytes to s3://{}/{}", content.len(), self.bucket, key);
        Ok(())
    }
}
