// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Saved message templates.

use rusqlite::{Row, params};
use smsgate_core::{MessageTemplate, SmsError};

use crate::database::Database;

fn template_from_row(row: &Row<'_>) -> Result<MessageTemplate, rusqlite::Error> {
    let variables: String = row.get(4)?;
    let variables = serde_json::from_str(&variables).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(MessageTemplate {
        id: row.get(0)?,
        client_id: row.get(1)?,
        name: row.get(2)?,
        text: row.get(3)?,
        variables,
        created_at: row.get(5)?,
    })
}

pub async fn insert_template(db: &Database, template: &MessageTemplate) -> Result<(), SmsError> {
    let template = template.clone();
    let variables = serde_json::to_string(&template.variables)
        .map_err(|e| SmsError::Internal(format!("template variables: {e}")))?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO templates (id, client_id, name, text, variables, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    template.id,
                    template.client_id,
                    template.name,
                    template.text,
                    variables,
                    template.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A client's templates, newest first.
pub async fn list_templates(
    db: &Database,
    client_id: &str,
) -> Result<Vec<MessageTemplate>, SmsError> {
    let client_id = client_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, client_id, name, text, variables, created_at FROM templates
                 WHERE client_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map(params![client_id], template_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{seed_client, setup_db};

    fn template(id: &str, client_id: &str, created_at: &str) -> MessageTemplate {
        MessageTemplate {
            id: id.into(),
            client_id: client_id.into(),
            name: format!("{id} name"),
            text: "Hi {name}, your code is {code}".into(),
            variables: vec!["name".into(), "code".into()],
            created_at: created_at.into(),
        }
    }

    #[tokio::test]
    async fn templates_list_newest_first() {
        let (db, _dir) = setup_db().await;
        seed_client(&db, "acme").await;
        seed_client(&db, "other").await;
        insert_template(&db, &template("t1", "acme", "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        insert_template(&db, &template("t2", "acme", "2026-01-02T00:00:00.000Z"))
            .await
            .unwrap();
        insert_template(&db, &template("t3", "other", "2026-01-03T00:00:00.000Z"))
            .await
            .unwrap();

        let listed = list_templates(&db, "acme").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t1"]);
        assert_eq!(listed[0].variables, vec!["name", "code"]);
        db.close().await.unwrap();
    }
}
