// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contacts and the best-effort contact/tag mapping.

use rusqlite::{OptionalExtension, Row, params};
use smsgate_core::{Contact, NewContact, SmsError, Tag};

use crate::database::{Database, now_ts};

const CONTACT_COLUMNS: &str = "id, client_id, phone, name, tag, created_at";

fn contact_from_row(row: &Row<'_>) -> Result<Contact, rusqlite::Error> {
    Ok(Contact {
        id: row.get(0)?,
        client_id: row.get(1)?,
        phone: row.get(2)?,
        name: row.get(3)?,
        tag: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Inserts all contacts in one transaction. Phones must already be normalized.
pub async fn insert_contacts(
    db: &Database,
    client_id: &str,
    contacts: &[NewContact],
) -> Result<Vec<Contact>, SmsError> {
    let client_id = client_id.to_string();
    let contacts = contacts.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let created_at = now_ts();
            let mut inserted = Vec::with_capacity(contacts.len());
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO contacts (id, client_id, phone, name, tag, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for contact in contacts {
                    let id = uuid::Uuid::new_v4().to_string();
                    stmt.execute(params![
                        id,
                        client_id,
                        contact.phone,
                        contact.name,
                        contact.tag,
                        created_at,
                    ])?;
                    inserted.push(Contact {
                        id,
                        client_id: client_id.clone(),
                        phone: contact.phone,
                        name: contact.name,
                        tag: contact.tag,
                        created_at: created_at.clone(),
                    });
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lists a client's contacts in insertion order, optionally filtered by tag.
pub async fn list_contacts(
    db: &Database,
    client_id: &str,
    tag: Option<&str>,
) -> Result<Vec<Contact>, SmsError> {
    let client_id = client_id.to_string();
    let tag = tag.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let sql = match tag {
                Some(_) => format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts
                     WHERE client_id = ?1 AND tag = ?2 ORDER BY rowid"
                ),
                None => format!(
                    "SELECT {CONTACT_COLUMNS} FROM contacts
                     WHERE client_id = ?1 ORDER BY rowid"
                ),
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = match &tag {
                Some(tag) => stmt.query_map(params![client_id, tag], contact_from_row)?,
                None => stmt.query_map(params![client_id], contact_from_row)?,
            };
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrites name and/or tag. Returns the updated contact, or `None` when the
/// contact does not belong to the client.
pub async fn update_contact(
    db: &Database,
    client_id: &str,
    contact_id: &str,
    name: Option<&str>,
    tag: Option<&str>,
) -> Result<Option<Contact>, SmsError> {
    let client_id = client_id.to_string();
    let contact_id = contact_id.to_string();
    let name = name.map(str::to_string);
    let tag = tag.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE contacts SET name = COALESCE(?3, name), tag = COALESCE(?4, tag)
                 WHERE id = ?1 AND client_id = ?2",
                params![contact_id, client_id, name, tag],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                params![contact_id],
                contact_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn delete_contact(
    db: &Database,
    client_id: &str,
    contact_id: &str,
) -> Result<bool, SmsError> {
    let client_id = client_id.to_string();
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM contacts WHERE id = ?1 AND client_id = ?2",
                params![contact_id, client_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Deletes every listed contact owned by the client in one transaction.
/// Ids belonging to other clients are skipped.
pub async fn delete_contacts(
    db: &Database,
    client_id: &str,
    contact_ids: &[String],
) -> Result<u64, SmsError> {
    let client_id = client_id.to_string();
    let contact_ids = contact_ids.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut deleted = 0u64;
            {
                let mut stmt =
                    tx.prepare("DELETE FROM contacts WHERE id = ?1 AND client_id = ?2")?;
                for id in &contact_ids {
                    deleted += stmt.execute(params![id, client_id])? as u64;
                }
            }
            tx.commit()?;
            Ok(deleted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Returns the tag's id, creating the tag first if it does not exist.
pub async fn ensure_tag(db: &Database, client_id: &str, name: &str) -> Result<String, SmsError> {
    let client_id = client_id.to_string();
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO tags (id, client_id, name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![uuid::Uuid::new_v4().to_string(), client_id, name, now_ts()],
            )?;
            conn.query_row(
                "SELECT id FROM tags WHERE client_id = ?1 AND name = ?2",
                params![client_id, name],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn link_contact_tag(
    db: &Database,
    contact_id: &str,
    tag_id: &str,
) -> Result<(), SmsError> {
    let contact_id = contact_id.to_string();
    let tag_id = tag_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO contact_tags (contact_id, tag_id) VALUES (?1, ?2)",
                params![contact_id, tag_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_tags(db: &Database, client_id: &str) -> Result<Vec<Tag>, SmsError> {
    let client_id = client_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, client_id, name, created_at FROM tags
                 WHERE client_id = ?1 ORDER BY name",
            )?;
            let rows = stmt.query_map(params![client_id], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    client_id: row.get(1)?,
                    name: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
