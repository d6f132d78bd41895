//! Filesystem storage backend.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::Error;
use crate::storage::MediaStorage;

/// Storage backend rooted at a local media directory.
///
/// Keys are joined with the root. Intermediate directories are created on
/// write. Keys that are absolute or climb out of the root are rejected.
#[derive(Debug, Clone)]
pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute path of a key, after checking it stays inside the root.
    pub fn resolve(&self, key: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(key.trim_start_matches('/'));
        if key.is_empty() || relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(Error::InvalidInput(format!("invalid storage key: {key}")));
        }
        Ok(self.base_dir.join(relative))
    }
}

#[async_trait]
impl MediaStorage for FsStorage {
    fn is_remote(&self) -> bool {
        false
    }

    async fn exists(&self, key: &str) -> Result<bool, Error> {
        let path = self.resolve(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Error::Storage(format!("{}: {e}", path.display())))
    }

    async fn read(&self, key: &str) -> Result<Bytes, Error> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(key.to_string())),
            Err(e) => Err(Error::Storage(format!("{}: {e}", path.display()))),
        }
    }

    async fn put(&self, key: &str, content: &[u8], _content_type: &str) -> Result<(), Error> {
        let path = self.resolve(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("{}: {e}", parent.display())))?;
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| Error::Storage(format!("{}: {e}", path.display())))?;

        tracing::debug!("wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }
}
