//! Users authenticated by bearer token.

use super::connection::Store;
use super::now_rfc3339;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub is_superuser: bool,
}

impl Store {
    /// Create a user with a freshly generated token.
    pub async fn create_user(&self, username: &str, is_superuser: bool) -> Result<User, Error> {
        if username.trim().is_empty() {
            return Err(Error::InvalidInput("username cannot be empty".into()));
        }

        let username = username.trim().to_string();
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.conn
            .call(move |conn| -> Result<User, Error> {
                conn.execute(
                    "INSERT INTO users (username, token, is_superuser, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![username, token, is_superuser as i32, now_rfc3339()],
                )?;
                Ok(User { id: conn.last_insert_rowid(), username, token, is_superuser })
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the user owning a bearer token.
    pub async fn user_by_token(&self, token: &str) -> Result<Option<User>, Error> {
        let token = token.to_string();
        self.conn
            .call(move |conn| -> Result<Option<User>, Error> {
                let result = conn.query_row(
                    "SELECT id, username, token, is_superuser FROM users WHERE token = ?1",
                    params![token],
                    |row| {
                        Ok(User {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            token: row.get(2)?,
                            is_superuser: row.get::<_, i32>(3)? == 1,
                        })
                    },
                );

                match result {
                    Ok(user) => Ok(Some(user)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = Store::open_in_memory().await.unwrap();
        let admin = store.create_user("admin", true).await.unwrap();
        assert_eq!(admin.token.len(), 32);

        let found = store.user_by_token(&admin.token).await.unwrap().unwrap();
        assert_eq!(found.id, admin.id);
        assert_eq!(found.username, "admin");
        assert!(found.is_superuser);
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let store = Store::open_in_memory().await.unwrap();
        store.create_user("editor", false).await.unwrap();
        assert!(store.user_by_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = Store::open_in_memory().await.unwrap();
        store.create_user("editor", false).await.unwrap();
        assert!(store.create_user("editor", true).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_username_rejected() {
        let store = Store::open_in_memory().await.unwrap();
        let result = store.create_user(" ", false).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
