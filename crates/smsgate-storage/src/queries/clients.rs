// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant accounts and usage counters.

use rusqlite::{OptionalExtension, params};
use smsgate_core::{Client, SmsError};

use crate::database::Database;

pub async fn create_client(db: &Database, client: &Client) -> Result<(), SmsError> {
    let client = client.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO clients (id, name, plan, used, allowance, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    client.id,
                    client.name,
                    client.plan,
                    client.used,
                    client.allowance,
                    client.is_admin,
                    client.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_client(db: &Database, id: &str) -> Result<Option<Client>, SmsError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, plan, used, allowance, is_admin, created_at
                 FROM clients WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Client {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        plan: row.get(2)?,
                        used: row.get(3)?,
                        allowance: row.get(4)?,
                        is_admin: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Adds `by` to `used`. Not guarded against exceeding the allowance; quota is
/// checked by callers beforehand.
pub async fn increment_usage(db: &Database, client_id: &str, by: i64) -> Result<(), SmsError> {
    let client_id = client_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE clients SET used = used + ?2 WHERE id = ?1",
                params![client_id, by],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn update_allowance(
    db: &Database,
    client_id: &str,
    allowance: i64,
) -> Result<bool, SmsError> {
    let client_id = client_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE clients SET allowance = ?2 WHERE id = ?1",
                params![client_id, allowance],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
