// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread, which makes
//! [`Database`] the only writer. Do NOT open additional connections for writes.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use smsgate_core::{SmsError, format_timestamp};
use tracing::debug;

/// Handle to an open, migrated SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode and
    /// applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, SmsError> {
        Self::open_with(path, true).await
    }

    /// Same as [`Database::open`] with an explicit journal mode choice.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, SmsError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(storage_err)?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(storage_err)?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        let applied = conn
            .call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(storage_err)?;

        debug!(path, wal_mode, applied, "database opened");
        Ok(Self { conn })
    }

    /// The single-writer connection. Query modules call through this.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Closes the connection, waiting for queued statements to finish.
    pub async fn close(self) -> Result<(), SmsError> {
        self.conn.close().await.map_err(storage_err)
    }
}

/// Wraps any backend error as [`SmsError::Storage`].
pub(crate) fn storage_err<E>(e: E) -> SmsError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SmsError::Storage {
        source: Box::new(e),
    }
}

/// Maps a tokio-rusqlite call error into [`SmsError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SmsError {
    storage_err(e)
}

/// Persisted form of an instant.
pub(crate) fn ts(at: DateTime<Utc>) -> String {
    format_timestamp(at)
}

/// Current wall-clock time in persisted form, for rows whose timestamp is
/// informational only.
pub(crate) fn now_ts() -> String {
    format_timestamp(Utc::now())
}

/// Parses a TEXT column into a `strum` enum, surfacing bad values as a
/// conversion failure rather than a panic.
pub(crate) fn parse_column<T>(idx: usize, value: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parses an optional JSON TEXT column.
pub(crate) fn parse_json(
    idx: usize,
    value: Option<String>,
) -> Result<Option<serde_json::Value>, rusqlite::Error> {
    value
        .map(|raw| {
            serde_json::from_str(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()
}
