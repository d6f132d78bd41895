//! The SQLite record store handle.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA busy_timeout=5000;
     PRAGMA foreign_keys=ON;";

/// Record store over one SQLite database.
///
/// Every query runs on the tokio-rusqlite background thread; clones share
/// that thread and connection.
#[derive(Clone, Debug)]
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open (or create) the database file at `path` and bring its schema up
    /// to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("{}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Fresh private database.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS)).await.map_err(Error::Database)?;
        migrations::run(&conn).await?;
        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_has_schema() {
        let store = Store::open_in_memory().await.unwrap();
        let users: i64 = store
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(users, 0);
    }

    #[tokio::test]
    async fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("folio.sqlite");

        let store = Store::open(&path).await.unwrap();
        store.create_user("editor", false).await.unwrap();
        drop(store);
        assert!(path.exists());

        let reopened = Store::open(&path).await.unwrap();
        assert!(reopened.user_by_token("missing").await.unwrap().is_none());
    }
}
