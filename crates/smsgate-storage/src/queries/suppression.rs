// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-client opt-out list.

use std::collections::HashSet;

use rusqlite::{OptionalExtension, params};
use smsgate_core::{SmsError, SuppressionEntry};

use crate::database::Database;

/// The subset of `phones` the client has suppressed. Uses the
/// `(client_id, phone)` primary key, one probe per phone.
pub async fn suppressed_phones(
    db: &Database,
    client_id: &str,
    phones: &[String],
) -> Result<HashSet<String>, SmsError> {
    if phones.is_empty() {
        return Ok(HashSet::new());
    }
    let client_id = client_id.to_string();
    let phones = phones.to_vec();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT 1 FROM suppression_list WHERE client_id = ?1 AND phone = ?2",
            )?;
            let mut found = HashSet::new();
            for phone in phones {
                let hit: Option<i64> = stmt
                    .query_row(params![client_id, phone], |row| row.get(0))
                    .optional()?;
                if hit.is_some() {
                    found.insert(phone);
                }
            }
            Ok(found)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Inserts an opt-out unless one already exists. Returns whether a row was added.
pub async fn add_suppression(db: &Database, entry: &SuppressionEntry) -> Result<bool, SmsError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO suppression_list (client_id, phone, reason, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entry.client_id, entry.phone, entry.reason, entry.created_at],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    fn entry(client_id: &str, phone: &str) -> SuppressionEntry {
        SuppressionEntry {
            client_id: client_id.to_string(),
            phone: phone.to_string(),
            reason: "STOP".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn suppression_is_per_client_and_idempotent() {
        let (db, _dir) = setup_db().await;

        assert!(add_suppression(&db, &entry("acme", "+27820000001")).await.unwrap());
        assert!(!add_suppression(&db, &entry("acme", "+27820000001")).await.unwrap());
        add_suppression(&db, &entry("other", "+27820000002")).await.unwrap();

        let candidates = vec!["+27820000001".to_string(), "+27820000002".to_string()];
        let hit = suppressed_phones(&db, "acme", &candidates).await.unwrap();
        assert_eq!(hit.len(), 1);
        assert!(hit.contains("+27820000001"));

        assert!(suppressed_phones(&db, "acme", &[]).await.unwrap().is_empty());
        db.close().await.unwrap();
    }
}
