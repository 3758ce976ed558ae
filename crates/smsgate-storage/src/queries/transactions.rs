// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send accounting records, also the source of truth for rate limiting and
//! inbound opt-out attribution.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use smsgate_core::{SmsError, SmsTransaction};

use crate::database::{Database, ts};

pub async fn insert_transaction(db: &Database, tx: &SmsTransaction) -> Result<(), SmsError> {
    let record = tx.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sms_transactions (id, client_id, campaign_id, to_number, message,
                                               status, cost, provider, provider_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.client_id,
                    record.campaign_id,
                    record.to_number,
                    record.message,
                    record.status.to_string(),
                    record.cost,
                    record.provider,
                    record.provider_id,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count_transactions_since(
    db: &Database,
    client_id: &str,
    since: DateTime<Utc>,
) -> Result<i64, SmsError> {
    let client_id = client_id.to_string();
    let since = ts(since);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM sms_transactions WHERE client_id = ?1 AND created_at >= ?2",
                params![client_id, since],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Client of the most recent transaction addressed to `phone`.
pub async fn latest_client_for_number(
    db: &Database,
    phone: &str,
) -> Result<Option<String>, SmsError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT client_id FROM sms_transactions WHERE to_number = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![phone],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use smsgate_core::MessageStatus;

    use crate::queries::test_support::setup_db;

    fn record(id: &str, client_id: &str, to: &str, created_at: &str) -> SmsTransaction {
        SmsTransaction {
            id: id.to_string(),
            client_id: client_id.to_string(),
            campaign_id: None,
            to_number: to.to_string(),
            message: "hi".to_string(),
            status: MessageStatus::Sent,
            cost: 0.25,
            provider: Some("bulksms".to_string()),
            provider_id: Some(format!("p-{id}")),
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn counts_within_window() {
        let (db, _dir) = setup_db().await;
        insert_transaction(&db, &record("1", "acme", "+1", "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        insert_transaction(&db, &record("2", "acme", "+1", "2026-01-01T00:00:30.000Z"))
            .await
            .unwrap();
        insert_transaction(&db, &record("3", "acme", "+1", "2026-01-01T00:01:10.000Z"))
            .await
            .unwrap();
        insert_transaction(&db, &record("4", "other", "+1", "2026-01-01T00:01:10.000Z"))
            .await
            .unwrap();

        let since = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 30).unwrap();
        assert_eq!(count_transactions_since(&db, "acme", since).await.unwrap(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn latest_sender_wins_attribution() {
        let (db, _dir) = setup_db().await;
        insert_transaction(&db, &record("1", "acme", "+27821", "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        insert_transaction(&db, &record("2", "other", "+27821", "2026-01-02T00:00:00.000Z"))
            .await
            .unwrap();

        assert_eq!(
            latest_client_for_number(&db, "+27821").await.unwrap().as_deref(),
            Some("other")
        );
        assert!(latest_client_for_number(&db, "+1").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
