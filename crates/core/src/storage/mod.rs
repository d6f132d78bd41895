//! Pluggable storage backends for original media files.
//!
//! Two backends ship with the crate:
//!
//! - [`FsStorage`] -- reads and writes under a local media root.
//! - [`S3Storage`] -- reads and writes objects in an S3 (or compatible)
//!   bucket (requires the `s3` feature).
//!
//! [`from_config`] picks one according to `storage.backend`.

mod fs;
#[cfg(feature = "s3")]
mod s3;

pub use fs::FsStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::Error;
use crate::config::{AppConfig, StorageBackend};

/// A backend that holds media files addressed by relative keys
/// such as `files/article/3/young.gif`.
#[async_trait]
pub trait MediaStorage: Send + Sync + 'static {
    /// True when files live outside the local filesystem.
    fn is_remote(&self) -> bool;

    /// Whether a file exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, Error>;

    /// Read the full contents stored under `key`.
    async fn read(&self, key: &str) -> Result<Bytes, Error>;

    /// Persist `content` under `key`, replacing any previous file.
    async fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<(), Error>;
}

/// Build the backend selected by configuration.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the S3 backend is selected without a
/// bucket, or if the crate was built without the `s3` feature.
pub async fn from_config(config: &AppConfig) -> Result<Arc<dyn MediaStorage>, Error> {
    match config.storage.backend {
        StorageBackend::Local => Ok(Arc::new(FsStorage::new(&config.storage.media_root))),
        #[cfg(feature = "s3")]
        StorageBackend::S3 => {
            let bucket = config.require_s3_bucket().map_err(|e| Error::InvalidInput(e.to_string()))?;
            Ok(Arc::new(S3Storage::from_env(bucket).await))
        }
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 => Err(Error::InvalidInput("built without the `s3` feature".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    #[tokio::test]
    async fn test_from_config_local() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            storage: StorageConfig { media_root: dir.path().to_path_buf(), ..Default::default() },
            ..Default::default()
        };
        let storage = from_config(&config).await.unwrap();
        assert!(!storage.is_remote());
        storage.put("a/b.txt", b"hi", "text/plain").await.unwrap();
        assert!(storage.exists("a/b.txt").await.unwrap());
    }
}
