// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by storage, dispatch and the HTTP gateway.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
}

/// A tenant account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub plan: String,
    /// Messages sent so far.
    pub used: i64,
    /// Total messages the client may send.
    pub allowance: i64,
    pub is_admin: bool,
    pub created_at: String,
}

impl Client {
    /// Messages left before the allowance is exhausted (never negative).
    pub fn remaining(&self) -> i64 {
        (self.allowance - self.used).max(0)
    }
}

/// Resolved identity of the caller of an API operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub client_id: String,
    pub is_admin: bool,
}

/// An address-book entry owned by exactly one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub client_id: String,
    pub phone: String,
    pub name: Option<String>,
    pub tag: Option<String>,
    pub created_at: String,
}

/// Fields for a contact that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewContact {
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// A named contact group, unique per client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub client_id: String,
    pub name: String,
    pub created_at: String,
}

/// A saved message body. `variables` lists its placeholder names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: String,
    pub client_id: String,
    pub name: String,
    pub text: String,
    pub variables: Vec<String>,
    pub created_at: String,
}

/// Lifecycle of a campaign: `draft|scheduled -> sending -> sent`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Sent,
}

impl CampaignStatus {
    /// Whether the dispatch loop should still consider this campaign.
    pub fn is_dispatchable(self) -> bool {
        matches!(self, Self::Draft | Self::Scheduled | Self::Sending)
    }
}

/// A named message plus delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub client_id: String,
    pub name: String,
    pub message: String,
    pub status: CampaignStatus,
    pub scheduled_for: Option<String>,
    /// Advisory time window and throttle settings, stored as JSON.
    pub scheduling_metadata: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// Status of a single outbound message: `queued -> sent|delivered|failed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Queued,
    Sent,
    Delivered,
    Failed,
}

/// One message per (campaign, recipient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMessage {
    pub id: String,
    pub campaign_id: String,
    pub to_number: String,
    pub body: String,
    pub status: MessageStatus,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub error: Option<String>,
    pub delivered_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A compiled message waiting to be enqueued for a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCampaignMessage {
    pub to_number: String,
    pub body: String,
}

/// Aggregate message counts for one campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStats {
    pub total: i64,
    pub queued: i64,
    pub sent: i64,
    pub delivered: i64,
    pub failed: i64,
    pub total_cost: f64,
}

/// Permanent opt-out of a phone number for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppressionEntry {
    pub client_id: String,
    pub phone: String,
    pub reason: String,
    pub created_at: String,
}

/// Stored API key metadata. The raw secret is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    pub client_id: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub created_at: String,
    pub last_used_at: Option<String>,
    pub revoked_at: Option<String>,
}

/// Accounting record for one send attempt outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsTransaction {
    pub id: String,
    pub client_id: String,
    pub campaign_id: Option<String>,
    pub to_number: String,
    pub message: String,
    pub status: MessageStatus,
    pub cost: f64,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub created_at: String,
}

/// Admin action log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub actor: String,
    pub action: String,
    pub target: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

/// What a provider reported for an accepted message. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderReceipt {
    pub message_id: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn campaign_status_snake_case() {
        assert_eq!(CampaignStatus::Sending.to_string(), "sending");
        assert_eq!(
            CampaignStatus::from_str("scheduled").unwrap(),
            CampaignStatus::Scheduled
        );
        assert!(!CampaignStatus::Sent.is_dispatchable());
        assert!(CampaignStatus::Draft.is_dispatchable());
    }

    #[test]
    fn message_status_serializes_lowercase() {
        let json = serde_json::to_string(&MessageStatus::Delivered).unwrap();
        assert_eq!(json, "\"delivered\"");
        assert!(MessageStatus::from_str("bogus").is_err());
    }

    #[test]
    fn api_key_hash_is_not_serialized() {
        let key = ApiKey {
            id: "k1".into(),
            client_id: "c1".into(),
            name: None,
            key_hash: "deadbeef".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            last_used_at: None,
            revoked_at: None,
        };
        let json = serde_json::to_value(&key).unwrap();
        assert!(json.get("keyHash").is_none());
        assert_eq!(json["clientId"], "c1");
    }

    #[test]
    fn remaining_never_negative() {
        let client = Client {
            id: "c".into(),
            name: "Acme".into(),
            plan: "starter".into(),
            used: 12,
            allowance: 10,
            is_admin: false,
            created_at: String::new(),
        };
        assert_eq!(client.remaining(), 0);
    }
}
