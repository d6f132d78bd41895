use std::sync::Arc;

use folio_core::image::ImageBuilder;
use folio_core::{AppConfig, Error, MediaStorage, Store, storage};

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub images: ImageBuilder,
}

impl AppState {
    pub fn new(store: Store, storage: Arc<dyn MediaStorage>, cache_pre_key: &str) -> Self {
        let images = ImageBuilder::new(store.clone(), storage, cache_pre_key);
        Self { store, images }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let store = Store::open(&config.db_path).await?;
        let storage = storage::from_config(config).await?;
        Ok(Self::new(store, storage, &config.cache_pre_key))
    }

    pub fn storage(&self) -> &Arc<dyn MediaStorage> {
        self.images.storage()
    }

    /// State over an in-memory store and a media root at `media_root`.
    #[cfg(test)]
    pub async fn for_tests(media_root: &std::path::Path) -> Self {
        let store = Store::open_in_memory().await.unwrap();
        let storage: Arc<dyn MediaStorage> = Arc::new(folio_core::FsStorage::new(media_root));
        Self::new(store, storage, "folio")
    }
}
