//! CMS content records scanned by the link repairer.

use super::connection::Store;
use super::now_rfc3339;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_rusqlite::{params, rusqlite};

/// Kind of content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Article,
    News,
    Page,
    Job,
    Event,
    Speaker,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::Article,
        ContentKind::News,
        ContentKind::Page,
        ContentKind::Job,
        ContentKind::Event,
        ContentKind::Speaker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::News => "news",
            ContentKind::Page => "page",
            ContentKind::Job => "job",
            ContentKind::Event => "event",
            ContentKind::Speaker => "speaker",
        }
    }

    /// Name of the text field holding the scanned markup.
    pub fn body_field(&self) -> &'static str {
        match self {
            ContentKind::Article | ContentKind::News => "body",
            ContentKind::Page => "content",
            ContentKind::Job | ContentKind::Event | ContentKind::Speaker => "description",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown content kind: {s}")))
    }
}

/// A CMS entity with a free-text body that may embed links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub kind: ContentKind,
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub creator_id: Option<i64>,
    #[serde(default)]
    pub creator_username: Option<String>,
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub owner_username: Option<String>,
}

fn kind_from_column(raw: String) -> rusqlite::Result<ContentKind> {
    raw.parse()
        .map_err(|e: Error| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.to_string().into()))
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContentItem> {
    Ok(ContentItem {
        kind: kind_from_column(row.get(0)?)?,
        id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        creator_id: row.get(4)?,
        creator_username: row.get(5)?,
        owner_id: row.get(6)?,
        owner_username: row.get(7)?,
    })
}

const SELECT_COLUMNS: &str = "SELECT kind, id, title, body, creator_id, creator_username, owner_id, owner_username
     FROM content_items";

impl Store {
    /// Insert or replace a content record.
    pub async fn upsert_content(&self, item: &ContentItem) -> Result<(), Error> {
        let item = item.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO content_items (
                        kind, id, title, body, creator_id, creator_username, owner_id, owner_username, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(kind, id) DO UPDATE SET
                        title = excluded.title,
                        body = excluded.body,
                        creator_id = excluded.creator_id,
                        creator_username = excluded.creator_username,
                        owner_id = excluded.owner_id,
                        owner_username = excluded.owner_username,
                        updated_at = excluded.updated_at",
                    params![
                        item.kind.as_str(),
                        item.id,
                        &item.title,
                        &item.body,
                        item.creator_id,
                        &item.creator_username,
                        item.owner_id,
                        &item.owner_username,
                        now_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All records of one kind, ordered by id.
    pub async fn list_content(&self, kind: ContentKind) -> Result<Vec<ContentItem>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<ContentItem>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE kind = ?1 ORDER BY id"))?;
                let items = stmt
                    .query_map(params![kind.as_str()], row_to_item)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn get_content(&self, kind: ContentKind, id: i64) -> Result<Option<ContentItem>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<ContentItem>, Error> {
                let result = conn.query_row(
                    &format!("{SELECT_COLUMNS} WHERE kind = ?1 AND id = ?2"),
                    params![kind.as_str(), id],
                    row_to_item,
                );
                match result {
                    Ok(item) => Ok(Some(item)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Replace the body of an existing record.
    pub async fn update_content_body(&self, kind: ContentKind, id: i64, body: &str) -> Result<(), Error> {
        let body = body.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let updated = conn.execute(
                    "UPDATE content_items SET body = ?1, updated_at = ?2 WHERE kind = ?3 AND id = ?4",
                    params![body, now_rfc3339(), kind.as_str(), id],
                )?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("{kind} {id}")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_item(kind: ContentKind, id: i64, body: &str) -> ContentItem {
        ContentItem {
            kind,
            id,
            title: format!("{kind} {id}"),
            body: body.to_string(),
            creator_id: Some(1),
            creator_username: Some("admin".into()),
            owner_id: None,
            owner_username: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_list_by_kind() {
        let store = Store::open_in_memory().await.unwrap();
        store.upsert_content(&make_item(ContentKind::Article, 2, "b")).await.unwrap();
        store.upsert_content(&make_item(ContentKind::Article, 1, "a")).await.unwrap();
        store.upsert_content(&make_item(ContentKind::Page, 1, "p")).await.unwrap();

        let articles = store.list_content(ContentKind::Article).await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].id, 1);
        assert_eq!(articles[1].body, "b");
        assert_eq!(articles[0].creator_username.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_update_body() {
        let store = Store::open_in_memory().await.unwrap();
        store.upsert_content(&make_item(ContentKind::Job, 5, "old")).await.unwrap();
        store.update_content_body(ContentKind::Job, 5, "new").await.unwrap();

        let job = store.get_content(ContentKind::Job, 5).await.unwrap().unwrap();
        assert_eq!(job.body, "new");
    }

    #[tokio::test]
    async fn test_update_missing_body() {
        let store = Store::open_in_memory().await.unwrap();
        let result = store.update_content_body(ContentKind::Event, 1, "x").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_kind_round_trip_names() {
        for kind in ContentKind::ALL {
            assert_eq!(kind.as_str().parse::<ContentKind>().unwrap(), kind);
        }
        assert!("blog".parse::<ContentKind>().is_err());
        assert_eq!(ContentKind::Page.body_field(), "content");
    }
}
