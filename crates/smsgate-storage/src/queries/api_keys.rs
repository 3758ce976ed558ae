// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key metadata. Only SHA-256 digests of secrets are stored.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use smsgate_core::{ApiKey, SmsError};

use crate::database::{Database, ts};

fn api_key_from_row(row: &Row<'_>) -> Result<ApiKey, rusqlite::Error> {
    Ok(ApiKey {
        id: row.get(0)?,
        client_id: row.get(1)?,
        name: row.get(2)?,
        key_hash: row.get(3)?,
        created_at: row.get(4)?,
        last_used_at: row.get(5)?,
        revoked_at: row.get(6)?,
    })
}

pub async fn insert_api_key(db: &Database, key: &ApiKey) -> Result<(), SmsError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO api_keys (id, client_id, name, key_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![key.id, key.client_id, key.name, key.key_hash, key.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Finds a non-revoked key by digest.
pub async fn find_api_key(db: &Database, key_hash: &str) -> Result<Option<ApiKey>, SmsError> {
    let key_hash = key_hash.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, client_id, name, key_hash, created_at, last_used_at, revoked_at
                 FROM api_keys WHERE key_hash = ?1 AND revoked_at IS NULL",
                params![key_hash],
                api_key_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn touch_api_key(db: &Database, id: &str, at: DateTime<Utc>) -> Result<(), SmsError> {
    let id = id.to_string();
    let at = ts(at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE api_keys SET last_used_at = ?2 WHERE id = ?1",
                params![id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All keys of a client, newest first, revoked ones included.
pub async fn list_api_keys(db: &Database, client_id: &str) -> Result<Vec<ApiKey>, SmsError> {
    let client_id = client_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, client_id, name, key_hash, created_at, last_used_at, revoked_at
                 FROM api_keys WHERE client_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map(params![client_id], api_key_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Returns `false` if the key is unknown, owned by another client, or already revoked.
pub async fn revoke_api_key(
    db: &Database,
    client_id: &str,
    id: &str,
    at: DateTime<Utc>,
) -> Result<bool, SmsError> {
    let client_id = client_id.to_string();
    let id = id.to_string();
    let at = ts(at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE api_keys SET revoked_at = ?3
                 WHERE id = ?1 AND client_id = ?2 AND revoked_at IS NULL",
                params![id, client_id, at],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
