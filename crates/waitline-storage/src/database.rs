// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread: `Database` wraps a single connection, query modules accept
//! `&Database` and go through `connection().call()`. Do NOT create
//! additional connections for writes -- the single-writer model is what
//! keeps SQLITE_BUSY out of the picture. The conditional status updates the
//! engine relies on are single statements, so they are atomic regardless.

use std::path::Path;

use tracing::debug;
use waitline_core::WaitlineError;

use crate::migrations;

/// Handle to the Waitline SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs, and
    /// run any pending migrations.
    ///
    /// Migrations run on a short-lived blocking connection before the async
    /// handle opens; WAL mode is a property of the database file and
    /// persists, while `foreign_keys`/`busy_timeout` are re-applied on the
    /// async connection.
    pub async fn open(path: &str) -> Result<Self, WaitlineError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| WaitlineError::Storage {
                source: Box::new(e),
            })?;
        }

        let migration_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), WaitlineError> {
            let mut conn =
                rusqlite::Connection::open(&migration_path).map_err(map_sqlite_err)?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )
            .map_err(map_sqlite_err)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| WaitlineError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path.to_string())
            .await
            .map_err(map_tr_err)?;
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection, for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), WaitlineError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> WaitlineError {
    WaitlineError::Storage {
        source: Box::new(e),
    }
}

/// Map a plain rusqlite error into the workspace error type.
pub fn map_sqlite_err(e: rusqlite::Error) -> WaitlineError {
    WaitlineError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists(), "database file should be created");

        // Schema tables exist after migration.
        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master
                     WHERE type = 'table'
                       AND name IN ('waitlist_entries', 'waitlist_offers', 'lifecycle_events')",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 3);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_twice_is_idempotent_for_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen_test.db");

        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();

        // Second open must not fail re-running applied migrations.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/dirs/waitline.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists());
        db.close().await.unwrap();
    }
}
