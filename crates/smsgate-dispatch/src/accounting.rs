// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transaction records and usage counters for completed sends.

use std::sync::Arc;

use smsgate_core::{Clock, MessageStatus, SmsTransaction, StorageAdapter};
use tracing::warn;
use uuid::Uuid;

use crate::fallback::DispatchResult;

/// Writes `sms_transactions` rows and bumps client usage.
///
/// All writes are best-effort: failures are logged and never change the
/// outcome already reported for the message.
pub struct Ledger {
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    message_cost: f64,
}

/// What was sent, to whom, on whose behalf.
pub struct SendRecord<'a> {
    pub client_id: &'a str,
    pub campaign_id: Option<&'a str>,
    pub to: &'a str,
    pub body: &'a str,
}

impl Ledger {
    pub fn new(storage: Arc<dyn StorageAdapter>, clock: Arc<dyn Clock>, message_cost: f64) -> Self {
        Self {
            storage,
            clock,
            message_cost,
        }
    }

    pub async fn record_sent(&self, record: &SendRecord<'_>, result: &DispatchResult) {
        self.insert(
            record,
            MessageStatus::Sent,
            self.message_cost,
            Some(result.provider_used.clone()),
            Some(result.id.clone()),
        )
        .await;
    }

    pub async fn record_failed(&self, record: &SendRecord<'_>) {
        self.insert(record, MessageStatus::Failed, 0.0, None, None).await;
    }

    /// Adds `count` to the client's usage counter.
    pub async fn add_usage(&self, client_id: &str, count: i64) {
        if count == 0 {
            return;
        }
        if let Err(e) = self.storage.increment_usage(client_id, count).await {
            warn!(client_id, count, error = %e, "failed to increment usage");
        }
    }

    async fn insert(
        &self,
        record: &SendRecord<'_>,
        status: MessageStatus,
        cost: f64,
        provider: Option<String>,
        provider_id: Option<String>,
    ) {
        let tx = SmsTransaction {
            id: Uuid::new_v4().to_string(),
            client_id: record.client_id.to_string(),
            campaign_id: record.campaign_id.map(str::to_string),
            to_number: record.to.to_string(),
            message: record.body.to_string(),
            status,
            cost,
            provider,
            provider_id,
            created_at: self.clock.timestamp(),
        };
        if let Err(e) = self.storage.insert_transaction(&tx).await {
            warn!(client_id = record.client_id, to = record.to, error = %e, "failed to record transaction");
        }
    }
}
