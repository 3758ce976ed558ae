// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin audit trail.

use rusqlite::{Row, params};
use smsgate_core::{AuditEntry, SmsError};

use crate::database::{Database, parse_json};

fn entry_from_row(row: &Row<'_>) -> Result<AuditEntry, rusqlite::Error> {
    Ok(AuditEntry {
        id: row.get(0)?,
        actor: row.get(1)?,
        action: row.get(2)?,
        target: row.get(3)?,
        details: parse_json(4, row.get(4)?)?,
        created_at: row.get(5)?,
    })
}

pub async fn insert_audit(db: &Database, entry: &AuditEntry) -> Result<(), SmsError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO audit_logs (id, actor, action, target, details, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.id,
                    entry.actor,
                    entry.action,
                    entry.target,
                    entry.details.as_ref().map(|d| d.to_string()),
                    entry.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// One page of entries, newest first, and the count of all entries matching
/// the `actor` filter.
pub async fn list_audit(
    db: &Database,
    actor: Option<&str>,
    limit: usize,
    offset: usize,
) -> Result<(Vec<AuditEntry>, i64), SmsError> {
    let actor = actor.map(str::to_string);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM audit_logs WHERE ?1 IS NULL OR actor = ?1",
                params![actor],
                |row| row.get(0),
            )?;
            let mut stmt = conn.prepare(
                "SELECT id, actor, action, target, details, created_at FROM audit_logs
                 WHERE ?1 IS NULL OR actor = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let items = stmt
                .query_map(params![actor, limit, offset], entry_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok((items, total))
        })
        .await
        .map_err(crate::database::map_tr_err)
}
