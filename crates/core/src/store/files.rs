//! File records for media held by a storage backend.

use super::connection::Store;
use super::content::{ContentItem, ContentKind};
use super::now_rfc3339;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A file to register, before it has an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFile {
    pub name: String,
    /// Key of the stored bytes inside the storage backend.
    pub path: String,
    pub size: u64,
    pub mime_type: Option<String>,
    pub content_kind: Option<ContentKind>,
    pub object_id: Option<i64>,
    pub creator_id: Option<i64>,
    pub creator_username: Option<String>,
    pub owner_id: Option<i64>,
    pub owner_username: Option<String>,
}

impl NewFile {
    /// Attach the file to a content record, copying its creator and owner.
    pub fn attached_to(mut self, owner: &ContentItem) -> Self {
        self.content_kind = Some(owner.kind);
        self.object_id = Some(owner.id);
        self.creator_id = owner.creator_id;
        self.creator_username = owner.creator_username.clone();
        self.owner_id = owner.owner_id;
        self.owner_username = owner.owner_username.clone();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    #[serde(flatten)]
    pub file: NewFile,
    pub created_at: String,
}

impl FileRecord {
    pub fn absolute_url(&self) -> String {
        format!("/files/{}/", self.id)
    }
}

const SELECT_COLUMNS: &str = "SELECT id, name, path, size, mime_type, content_kind, object_id,
            creator_id, creator_username, owner_id, owner_username, created_at
     FROM files";

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    let kind: Option<String> = row.get(5)?;
    Ok(FileRecord {
        id: row.get(0)?,
        file: NewFile {
            name: row.get(1)?,
            path: row.get(2)?,
            size: row.get::<_, i64>(3)? as u64,
            mime_type: row.get(4)?,
            content_kind: kind.and_then(|k| k.parse().ok()),
            object_id: row.get(6)?,
            creator_id: row.get(7)?,
            creator_username: row.get(8)?,
            owner_id: row.get(9)?,
            owner_username: row.get(10)?,
        },
        created_at: row.get(11)?,
    })
}

impl Store {
    pub async fn insert_file(&self, file: &NewFile) -> Result<FileRecord, Error> {
        let file = file.clone();
        self.conn
            .call(move |conn| -> Result<FileRecord, Error> {
                let created_at = now_rfc3339();
                conn.execute(
                    "INSERT INTO files (
                        name, path, size, mime_type, content_kind, object_id,
                        creator_id, creator_username, owner_id, owner_username, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        &file.name,
                        &file.path,
                        file.size as i64,
                        &file.mime_type,
                        file.content_kind.map(|k| k.as_str()),
                        file.object_id,
                        file.creator_id,
                        &file.creator_username,
                        file.owner_id,
                        &file.owner_username,
                        &created_at,
                    ],
                )?;
                Ok(FileRecord { id: conn.last_insert_rowid(), file, created_at })
            })
            .await
            .map_err(Error::from)
    }

    pub async fn get_file(&self, id: i64) -> Result<Option<FileRecord>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<FileRecord>, Error> {
                let result = conn.query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], row_to_record);

                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Files attached to one content record.
    pub async fn files_for(&self, kind: ContentKind, object_id: i64) -> Result<Vec<FileRecord>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<FileRecord>, Error> {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_COLUMNS} WHERE content_kind = ?1 AND object_id = ?2 ORDER BY id"))?;
                let records = stmt
                    .query_map(params![kind.as_str(), object_id], row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> ContentItem {
        ContentItem {
            kind: ContentKind::Article,
            id: 3,
            title: "Spring gala".into(),
            body: String::new(),
            creator_id: Some(10),
            creator_username: Some("jo".into()),
            owner_id: Some(11),
            owner_username: Some("sam".into()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = Store::open_in_memory().await.unwrap();
        let new = NewFile {
            name: "young.gif".into(),
            path: "files/article/3/young.gif".into(),
            size: 1234,
            mime_type: Some("image/gif".into()),
            ..Default::default()
        }
        .attached_to(&owner());

        let record = store.insert_file(&new).await.unwrap();
        assert_eq!(record.absolute_url(), format!("/files/{}/", record.id));

        let fetched = store.get_file(record.id).await.unwrap().unwrap();
        assert_eq!(fetched.file, new);
        assert_eq!(fetched.file.content_kind, Some(ContentKind::Article));
        assert_eq!(fetched.file.creator_username.as_deref(), Some("jo"));
        assert_eq!(fetched.file.owner_id, Some(11));
    }

    #[tokio::test]
    async fn test_files_for_owner() {
        let store = Store::open_in_memory().await.unwrap();
        let attached = NewFile { name: "a.png".into(), path: "a.png".into(), ..Default::default() }.attached_to(&owner());
        store.insert_file(&attached).await.unwrap();
        store
            .insert_file(&NewFile { name: "loose.png".into(), path: "loose.png".into(), ..Default::default() })
            .await
            .unwrap();

        let files = store.files_for(ContentKind::Article, 3).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file.name, "a.png");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.get_file(1).await.unwrap().is_none());
    }
}
