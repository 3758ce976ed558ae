// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery receipts and inbound replies posted by the gateways.
//!
//! Payload field names differ per provider, so every field is looked up
//! through a list of aliases.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use smsgate_core::{Clock, MessageStatus, SmsError, StorageAdapter};
use tracing::{debug, info};

use crate::suppression::SuppressionFilter;

const STATUS_KEYS: &[&str] = &["status", "SMSStatus", "dlrStatus"];
const ID_KEYS: &[&str] = &["messageId", "id", "provider_id"];
const PHONE_KEYS: &[&str] = &["msisdn", "from", "to", "recipient"];
const TEXT_KEYS: &[&str] = &["text", "message"];

/// Provider-neutral view of a webhook payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundEvent {
    pub status: Option<String>,
    pub message_id: Option<String>,
    pub phone: Option<String>,
    pub text: Option<String>,
}

impl InboundEvent {
    /// Builds an event from flat string fields (a form body).
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let pick = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| fields.get(*k))
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            status: pick(STATUS_KEYS),
            message_id: pick(ID_KEYS),
            phone: pick(PHONE_KEYS),
            text: pick(TEXT_KEYS),
        }
    }

    /// Builds an event from a JSON object. Scalars are stringified and a
    /// nested `{"type": ...}` object is read as its type.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        let fields = object
            .iter()
            .filter_map(|(k, v)| {
                let text = match v {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    serde_json::Value::Object(o) => o.get("type")?.as_str()?.to_string(),
                    _ => return None,
                };
                Some((k.clone(), text))
            })
            .collect();
        Self::from_fields(&fields)
    }
}

/// Maps a provider status string onto a message status. `None` means the
/// status is not understood and should be ignored.
pub fn map_delivery_status(raw: &str) -> Option<MessageStatus> {
    let status = raw.trim().to_ascii_lowercase();
    if ["fail", "reject", "undeliv", "expire"]
        .iter()
        .any(|s| status.contains(s))
    {
        return Some(MessageStatus::Failed);
    }
    if status.contains("deliver") || status == "success" {
        return Some(MessageStatus::Delivered);
    }
    match status.as_str() {
        "sent" | "accepted" | "submitted" | "buffered" | "queued" => Some(MessageStatus::Sent),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    pub updated: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppressed_for: Option<String>,
}

pub struct ReceiptProcessor {
    storage: Arc<dyn StorageAdapter>,
    suppression: Arc<SuppressionFilter>,
    clock: Arc<dyn Clock>,
}

impl ReceiptProcessor {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        suppression: Arc<SuppressionFilter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            suppression,
            clock,
        }
    }

    /// Applies any delivery status in `event`, then checks its text for an
    /// opt-out. Fails only when storage is unavailable.
    pub async fn process(&self, provider: &str, event: &InboundEvent) -> Result<WebhookOutcome, SmsError> {
        let mut outcome = WebhookOutcome {
            received: true,
            ..WebhookOutcome::default()
        };

        if let Some(raw) = event.status.as_deref() {
            match (map_delivery_status(raw), event.message_id.as_deref()) {
                (Some(status), Some(id)) => {
                    outcome.updated = self
                        .storage
                        .apply_delivery_status(id, status, self.clock.now())
                        .await?;
                    outcome.status = Some(status);
                    info!(provider, provider_id = id, %status, updated = outcome.updated, "delivery receipt applied");
                }
                (Some(_), None) => debug!(provider, status = raw, "delivery receipt without message id"),
                (None, _) => debug!(provider, status = raw, "unrecognized delivery status ignored"),
            }
        }

        if let (Some(phone), Some(text)) = (event.phone.as_deref(), event.text.as_deref()) {
            outcome.suppressed_for = self.suppression.handle_inbound(phone, text).await?;
        }

        Ok(outcome)
    }
}
