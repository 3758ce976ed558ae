// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaigns, their queued messages, and delivery receipt updates.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use smsgate_core::{
    Campaign, CampaignMessage, CampaignStats, CampaignStatus, MessageStatus, NewCampaignMessage,
    SmsError,
};

use crate::database::{Database, parse_column, parse_json, ts};

const CAMPAIGN_COLUMNS: &str = "id, client_id, name, message, status, scheduled_for, \
     scheduling_metadata, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, campaign_id, to_number, body, status, provider, \
     provider_id, error, delivered_at, created_at, updated_at";

fn campaign_from_row(row: &Row<'_>) -> Result<Campaign, rusqlite::Error> {
    Ok(Campaign {
        id: row.get(0)?,
        client_id: row.get(1)?,
        name: row.get(2)?,
        message: row.get(3)?,
        status: parse_column(4, row.get(4)?)?,
        scheduled_for: row.get(5)?,
        scheduling_metadata: parse_json(6, row.get(6)?)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn message_from_row(row: &Row<'_>) -> Result<CampaignMessage, rusqlite::Error> {
    Ok(CampaignMessage {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        to_number: row.get(2)?,
        body: row.get(3)?,
        status: parse_column(4, row.get(4)?)?,
        provider: row.get(5)?,
        provider_id: row.get(6)?,
        error: row.get(7)?,
        delivered_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Inserts the campaign and every message as `queued`, atomically.
pub async fn create_campaign(
    db: &Database,
    campaign: &Campaign,
    messages: &[NewCampaignMessage],
) -> Result<(), SmsError> {
    let campaign = campaign.clone();
    let messages = messages.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO campaigns (id, client_id, name, message, status, scheduled_for,
                                        scheduling_metadata, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    campaign.id,
                    campaign.client_id,
                    campaign.name,
                    campaign.message,
                    campaign.status.to_string(),
                    campaign.scheduled_for,
                    campaign.scheduling_metadata.as_ref().map(|v| v.to_string()),
                    campaign.created_at,
                    campaign.updated_at,
                ],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO campaign_messages (id, campaign_id, to_number, body, status,
                                                    created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, 'queued', ?5, ?5)",
                )?;
                for message in &messages {
                    stmt.execute(params![
                        uuid::Uuid::new_v4().to_string(),
                        campaign.id,
                        message.to_number,
                        message.body,
                        campaign.created_at,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_campaign(
    db: &Database,
    client_id: &str,
    id: &str,
) -> Result<Option<Campaign>, SmsError> {
    let client_id = client_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1 AND client_id = ?2"),
                params![id, client_id],
                campaign_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A client's campaigns, newest first.
pub async fn list_campaigns(db: &Database, client_id: &str) -> Result<Vec<Campaign>, SmsError> {
    let client_id = client_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                 WHERE client_id = ?1 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![client_id], campaign_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Campaigns the dispatch loop should advance at `now`, oldest first.
pub async fn due_campaigns(db: &Database, now: DateTime<Utc>) -> Result<Vec<Campaign>, SmsError> {
    let now = ts(now);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                 WHERE status IN ('draft', 'scheduled', 'sending')
                   AND (scheduled_for IS NULL OR scheduled_for <= ?1)
                 ORDER BY created_at, rowid"
            ))?;
            let rows = stmt.query_map(params![now], campaign_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn set_campaign_status(
    db: &Database,
    id: &str,
    status: CampaignStatus,
    at: DateTime<Utc>,
) -> Result<(), SmsError> {
    let id = id.to_string();
    let at = ts(at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.to_string(), at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Moves a campaign to `scheduled`. Returns `false` when the campaign does not
/// belong to the client.
pub async fn schedule_campaign(
    db: &Database,
    client_id: &str,
    id: &str,
    scheduled_for: DateTime<Utc>,
    metadata: Option<serde_json::Value>,
    at: DateTime<Utc>,
) -> Result<bool, SmsError> {
    let client_id = client_id.to_string();
    let id = id.to_string();
    let scheduled_for = ts(scheduled_for);
    let metadata = metadata.map(|v| v.to_string());
    let at = ts(at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaigns
                 SET scheduled_for = ?3, status = 'scheduled',
                     scheduling_metadata = COALESCE(?4, scheduling_metadata),
                     updated_at = ?5
                 WHERE id = ?1 AND client_id = ?2",
                params![id, client_id, scheduled_for, metadata, at],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages of one campaign in `status`, in enqueue order.
pub async fn campaign_messages(
    db: &Database,
    campaign_id: &str,
    status: MessageStatus,
    limit: Option<usize>,
) -> Result<Vec<CampaignMessage>, SmsError> {
    let campaign_id = campaign_id.to_string();
    // SQLite treats a negative LIMIT as unbounded.
    let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM campaign_messages
                 WHERE campaign_id = ?1 AND status = ?2
                 ORDER BY rowid LIMIT ?3"
            ))?;
            let rows = stmt.query_map(
                params![campaign_id, status.to_string(), limit],
                message_from_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn mark_message_sent(
    db: &Database,
    message_id: &str,
    provider: &str,
    provider_id: &str,
    at: DateTime<Utc>,
) -> Result<(), SmsError> {
    let message_id = message_id.to_string();
    let provider = provider.to_string();
    let provider_id = provider_id.to_string();
    let at = ts(at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaign_messages
                 SET status = 'sent', provider = ?2, provider_id = ?3, error = NULL,
                     updated_at = ?4
                 WHERE id = ?1",
                params![message_id, provider, provider_id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn mark_message_failed(
    db: &Database,
    message_id: &str,
    error: &str,
    at: DateTime<Utc>,
) -> Result<(), SmsError> {
    let message_id = message_id.to_string();
    let error = error.to_string();
    let at = ts(at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaign_messages
                 SET status = 'failed', error = ?2, updated_at = ?3
                 WHERE id = ?1",
                params![message_id, error, at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Per-status counts plus the summed transaction cost.
pub async fn campaign_stats(db: &Database, campaign_id: &str) -> Result<CampaignStats, SmsError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stats = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status = 'queued'), 0),
                        COALESCE(SUM(status = 'sent'), 0),
                        COALESCE(SUM(status = 'delivered'), 0),
                        COALESCE(SUM(status = 'failed'), 0)
                 FROM campaign_messages WHERE campaign_id = ?1",
                params![campaign_id],
                |row| {
                    Ok(CampaignStats {
                        total: row.get(0)?,
                        queued: row.get(1)?,
                        sent: row.get(2)?,
                        delivered: row.get(3)?,
                        failed: row.get(4)?,
                        total_cost: 0.0,
                    })
                },
            )?;
            stats.total_cost = conn.query_row(
                "SELECT COALESCE(SUM(cost), 0.0) FROM sms_transactions WHERE campaign_id = ?1",
                params![campaign_id],
                |row| row.get(0),
            )?;
            Ok(stats)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Applies a delivery receipt to campaign messages and transactions sharing
/// `provider_id`. A `delivered` status also stamps `delivered_at` with `at`.
pub async fn apply_delivery_status(
    db: &Database,
    provider_id: &str,
    status: MessageStatus,
    at: DateTime<Utc>,
) -> Result<u64, SmsError> {
    let provider_id = provider_id.to_string();
    let at = ts(at);
    let delivered_at = (status == MessageStatus::Delivered).then(|| at.clone());
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let messages = tx.execute(
                "UPDATE campaign_messages
                 SET status = ?2, delivered_at = COALESCE(?3, delivered_at), updated_at = ?4
                 WHERE provider_id = ?1",
                params![provider_id, status.to_string(), delivered_at, at],
            )?;
            let transactions = tx.execute(
                "UPDATE sms_transactions SET status = ?2 WHERE provider_id = ?1",
                params![provider_id, status.to_string()],
            )?;
            tx.commit()?;
            Ok((messages + transactions) as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
