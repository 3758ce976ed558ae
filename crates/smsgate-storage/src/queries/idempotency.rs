// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotency key records.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use smsgate_core::SmsError;

use crate::database::{Database, ts};

/// Whether `(key, client_id)` was recorded at or after `since`.
pub async fn idempotency_seen(
    db: &Database,
    key: &str,
    client_id: &str,
    since: DateTime<Utc>,
) -> Result<bool, SmsError> {
    let key = key.to_string();
    let client_id = client_id.to_string();
    let since = ts(since);
    db.connection()
        .call(move |conn| {
            let hit: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM idempotency
                     WHERE key = ?1 AND client_id = ?2 AND created_at >= ?3",
                    params![key, client_id, since],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(hit.is_some())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Upserts `(key, client_id)`. An expired record is refreshed to `at`, so the
/// window restarts.
pub async fn record_idempotency(
    db: &Database,
    key: &str,
    client_id: &str,
    at: DateTime<Utc>,
) -> Result<(), SmsError> {
    let key = key.to_string();
    let client_id = client_id.to_string();
    let at = ts(at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO idempotency (key, client_id, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key, client_id) DO UPDATE SET created_at = excluded.created_at",
                params![key, client_id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn window_is_measured_from_creation() {
        let (db, _dir) = setup_db().await;
        let created = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        record_idempotency(&db, "key-1", "acme", created).await.unwrap();

        let inside = created + Duration::hours(23);
        let outside = created + Duration::hours(25);
        assert!(
            idempotency_seen(&db, "key-1", "acme", inside - Duration::hours(24))
                .await
                .unwrap()
        );
        assert!(
            !idempotency_seen(&db, "key-1", "acme", outside - Duration::hours(24))
                .await
                .unwrap()
        );
        assert!(
            !idempotency_seen(&db, "key-1", "other", inside - Duration::hours(24))
                .await
                .unwrap()
        );

        // Re-recording refreshes rather than failing on the primary key.
        record_idempotency(&db, "key-1", "acme", outside).await.unwrap();
        assert!(
            idempotency_seen(&db, "key-1", "acme", outside - Duration::hours(24))
                .await
                .unwrap()
        );
        db.close().await.unwrap();
    }
}
