//! Versioned schema migrations.
//!
//! Applied versions are recorded in `_migrations`; each pending script runs
//! in its own transaction together with its version row.

use super::Error;
use tokio_rusqlite::{Connection, params, rusqlite};

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "exports_users", sql: include_str!("../../migrations/001_exports_users.sql") },
    Migration { version: 2, name: "content_files", sql: include_str!("../../migrations/002_content_files.sql") },
    Migration { version: 3, name: "image_cache", sql: include_str!("../../migrations/003_image_cache.sql") },
];

fn current_version(conn: &rusqlite::Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))
}

/// Apply every migration newer than the recorded version.
///
/// # Errors
///
/// `Error::MigrationFailed` naming the script that failed.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )?;

        let current = current_version(conn)?;
        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let failed = |e: rusqlite::Error| {
                Error::MigrationFailed(format!("{:03}_{}: {e}", migration.version, migration.name))
            };

            let tx = conn.transaction().map_err(failed)?;
            tx.execute_batch(migration.sql).map_err(failed)?;
            tx.execute(
                "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, super::now_rfc3339()],
            )
            .map_err(failed)?;
            tx.commit().map_err(failed)?;

            tracing::info!(version = migration.version, name = migration.name, "applied migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn tables(conn: &Connection) -> Vec<String> {
        conn.call(|conn| -> rusqlite::Result<Vec<String>> {
            let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
            stmt.query_map([], |row| row.get(0))?.collect::<rusqlite::Result<Vec<String>>>()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_creates_all_tables() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let tables = tables(&conn).await;
        for table in ["users", "ics_exports", "content_items", "files", "image_cache"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_rerun_is_noop() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let (count, version) = conn
            .call(|conn| -> rusqlite::Result<(i64, i64)> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))?;
                Ok((count, current_version(conn)?))
            })
            .await
            .unwrap();

        assert_eq!(count, MIGRATIONS.len() as i64);
        assert_eq!(version, 3);
    }

    #[test]
    fn test_versions_ascend() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
    }
}
