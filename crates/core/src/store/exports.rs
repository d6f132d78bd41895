//! Calendar export records.
//!
//! An export is created by a scheduling job in the `pending` state, filled
//! with the generated `.ics` payload once the job finishes, and then read by
//! the status and download endpoints.

use super::connection::Store;
use super::now_rfc3339;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_rusqlite::{params, rusqlite};

/// Lifecycle state of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Pending,
    Completed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Pending => "pending",
            ExportStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExportStatus::Pending),
            "completed" => Ok(ExportStatus::Completed),
            other => Err(Error::InvalidInput(format!("unknown export status: {other}"))),
        }
    }
}

/// A generated calendar file tracked by identifier and status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcsExport {
    pub id: i64,
    pub status: ExportStatus,
    pub file_name: String,
    #[serde(skip)]
    pub result: Option<Vec<u8>>,
    pub user_id: Option<i64>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl IcsExport {
    pub fn is_completed(&self) -> bool {
        self.status == ExportStatus::Completed
    }
}

fn status_from_column(raw: String) -> rusqlite::Result<ExportStatus> {
    raw.parse()
        .map_err(|e: Error| rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.to_string().into()))
}

impl Store {
    /// Register a new pending export and return its id.
    pub async fn create_export(&self, file_name: &str, user_id: Option<i64>) -> Result<i64, Error> {
        let file_name = file_name.to_string();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO ics_exports (status, file_name, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![ExportStatus::Pending.as_str(), file_name, user_id, now_rfc3339()],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    /// Store the generated payload and mark the export completed.
    pub async fn complete_export(&self, id: i64, payload: Vec<u8>) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let updated = conn.execute(
                    "UPDATE ics_exports SET status = ?1, result = ?2, completed_at = ?3 WHERE id = ?4",
                    params![ExportStatus::Completed.as_str(), payload, now_rfc3339(), id],
                )?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("ics export {id}")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an export by id.
    ///
    /// Returns None if the id doesn't exist.
    pub async fn get_export(&self, id: i64) -> Result<Option<IcsExport>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<IcsExport>, Error> {
                let result = conn.query_row(
                    "SELECT id, status, file_name, result, user_id, created_at, completed_at
                     FROM ics_exports WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(IcsExport {
                            id: row.get(0)?,
                            status: status_from_column(row.get(1)?)?,
                            file_name: row.get(2)?,
                            result: row.get(3)?,
                            user_id: row.get(4)?,
                            created_at: row.get(5)?,
                            completed_at: row.get(6)?,
                        })
                    },
                );

                match result {
                    Ok(export) => Ok(Some(export)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}
