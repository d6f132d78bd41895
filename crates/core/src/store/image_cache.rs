//! Resized image binaries keyed by deterministic cache keys.
//!
//! Entries are written first-write-wins: an `add` for a key that already
//! holds a live entry leaves it untouched. Expired entries are invisible to
//! reads and may be overwritten by the next `add`.

use super::connection::Store;
use super::{now_rfc3339, timestamp};
use crate::Error;
use std::time::Duration;
use tokio_rusqlite::{params, rusqlite};

/// Lifetime of a cached resized image (30 days).
pub const IMAGE_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

impl Store {
    /// Get a live cached payload.
    pub async fn get_cached_image(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let key = key.to_string();
        let now = now_rfc3339();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let result = conn.query_row(
                    "SELECT payload FROM image_cache WHERE key = ?1 AND expires_at > ?2",
                    params![key, now],
                    |row| row.get(0),
                );
                match result {
                    Ok(payload) => Ok(Some(payload)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Add a payload unless a live entry already exists.
    ///
    /// Returns true if this call stored the payload.
    pub async fn add_cached_image(&self, key: &str, payload: &[u8], ttl: Duration) -> Result<bool, Error> {
        let key = key.to_string();
        let payload = payload.to_vec();
        let now = chrono::Utc::now();
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| Error::InvalidInput(format!("cache ttl: {e}")))?;
        let created_at = timestamp(now);
        let expires_at = timestamp(now + ttl);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let changed = conn.execute(
                    "INSERT INTO image_cache (key, payload, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(key) DO UPDATE SET
                        payload = excluded.payload,
                        created_at = excluded.created_at,
                        expires_at = excluded.expires_at
                     WHERE image_cache.expires_at <= excluded.created_at",
                    params![key, payload, created_at, expires_at],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove one entry. Returns true if it existed.
    pub async fn delete_cached_image(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM image_cache WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_images(&self) -> Result<u64, Error> {
        let now = now_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM image_cache WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry whose key starts with `prefix`.
    pub async fn purge_images_by_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let pattern = format!("{}%", prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM image_cache WHERE key LIKE ?1 ESCAPE '\\'", params![pattern])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_cached_images(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM image_cache", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_get() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.add_cached_image("folio.file_image.k", b"jpeg", IMAGE_CACHE_TTL).await.unwrap());

        let payload = store.get_cached_image("folio.file_image.k").await.unwrap();
        assert_eq!(payload.as_deref(), Some(&b"jpeg"[..]));
    }

    #[tokio::test]
    async fn test_add_is_first_write_wins() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.add_cached_image("k", b"first", IMAGE_CACHE_TTL).await.unwrap());
        assert!(!store.add_cached_image("k", b"second", IMAGE_CACHE_TTL).await.unwrap());

        let payload = store.get_cached_image("k").await.unwrap().unwrap();
        assert_eq!(payload, b"first");
    }

    #[tokio::test]
    async fn test_expired_entry_is_hidden_and_replaceable() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_cached_image("k", b"stale", Duration::ZERO).await.unwrap();
        assert!(store.get_cached_image("k").await.unwrap().is_none());

        assert!(store.add_cached_image("k", b"fresh", IMAGE_CACHE_TTL).await.unwrap());
        assert_eq!(store.get_cached_image("k").await.unwrap().unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_cached_image("old", b"x", Duration::ZERO).await.unwrap();
        store.add_cached_image("new", b"y", IMAGE_CACHE_TTL).await.unwrap();

        assert_eq!(store.purge_expired_images().await.unwrap(), 1);
        assert_eq!(store.count_cached_images().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_by_prefix_and_delete() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_cached_image("folio.photo.1", b"a", IMAGE_CACHE_TTL).await.unwrap();
        store.add_cached_image("folio.photo.2", b"b", IMAGE_CACHE_TTL).await.unwrap();
        store.add_cached_image("folio.file_image.1", b"c", IMAGE_CACHE_TTL).await.unwrap();

        assert_eq!(store.purge_images_by_prefix("folio.photo.").await.unwrap(), 2);
        assert!(store.delete_cached_image("folio.file_image.1").await.unwrap());
        assert!(!store.delete_cached_image("folio.file_image.1").await.unwrap());
        assert_eq!(store.count_cached_images().await.unwrap(), 0);
    }
}
