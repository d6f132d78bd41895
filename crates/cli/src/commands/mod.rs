pub mod cache;
pub mod content;
pub mod ics;
pub mod repair;
pub mod resize;
pub mod users;

use anyhow::Result;
use folio_core::{AppConfig, Store};

pub async fn open_store(config: &AppConfig) -> Result<Store> {
    tracing::debug!(db = %config.db_path.display(), "opening store");
    Ok(Store::open(&config.db_path).await?)
}
