// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SmsError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ApiKey, AuditEntry, Campaign, CampaignMessage, CampaignStats, CampaignStatus, Client, Contact,
    MessageStatus, MessageTemplate, NewCampaignMessage, NewContact, SmsTransaction,
    SuppressionEntry, Tag,
};

/// Adapter for the multi-tenant relational store.
///
/// Every client-scoped lookup takes the client id so that one tenant can never
/// observe another tenant's rows. None of the read-then-write sequences built
/// on top of this trait are transactional unless stated.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), SmsError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), SmsError>;

    // --- Clients ---

    async fn create_client(&self, client: &Client) -> Result<(), SmsError>;

    async fn get_client(&self, id: &str) -> Result<Option<Client>, SmsError>;

    /// Adds `by` to the client's `used` counter.
    async fn increment_usage(&self, client_id: &str, by: i64) -> Result<(), SmsError>;

    /// Returns `false` when no such client exists.
    async fn update_allowance(&self, client_id: &str, allowance: i64) -> Result<bool, SmsError>;

    // --- Contacts and tags ---

    /// Inserts contacts whose phones are already normalized.
    async fn insert_contacts(
        &self,
        client_id: &str,
        contacts: &[NewContact],
    ) -> Result<Vec<Contact>, SmsError>;

    /// Lists a client's contacts in insertion order, optionally filtered by tag.
    async fn list_contacts(
        &self,
        client_id: &str,
        tag: Option<&str>,
    ) -> Result<Vec<Contact>, SmsError>;

    /// Overwrites the name and/or tag of a contact. `None` leaves a field untouched.
    async fn update_contact(
        &self,
        client_id: &str,
        contact_id: &str,
        name: Option<&str>,
        tag: Option<&str>,
    ) -> Result<Option<Contact>, SmsError>;

    async fn delete_contact(&self, client_id: &str, contact_id: &str) -> Result<bool, SmsError>;

    /// Deletes the listed contacts that belong to the client. Returns how many went.
    async fn delete_contacts(
        &self,
        client_id: &str,
        contact_ids: &[String],
    ) -> Result<u64, SmsError>;

    /// Returns the id of the named tag, creating it if needed.
    async fn ensure_tag(&self, client_id: &str, name: &str) -> Result<String, SmsError>;

    async fn link_contact_tag(&self, contact_id: &str, tag_id: &str) -> Result<(), SmsError>;

    /// A client's tags ordered by name.
    async fn list_tags(&self, client_id: &str) -> Result<Vec<Tag>, SmsError>;

    // --- Templates ---

    async fn insert_template(&self, template: &MessageTemplate) -> Result<(), SmsError>;

    /// A client's templates, newest first.
    async fn list_templates(&self, client_id: &str) -> Result<Vec<MessageTemplate>, SmsError>;

    // --- Campaigns ---

    /// Inserts the campaign and all of its `queued` messages in one transaction.
    async fn create_campaign(
        &self,
        campaign: &Campaign,
        messages: &[NewCampaignMessage],
    ) -> Result<(), SmsError>;

    async fn get_campaign(&self, client_id: &str, id: &str) -> Result<Option<Campaign>, SmsError>;

    /// A client's campaigns, newest first.
    async fn list_campaigns(&self, client_id: &str) -> Result<Vec<Campaign>, SmsError>;

    /// Campaigns with `scheduled_for` null or not after `now` whose status is
    /// `draft`, `scheduled` or `sending`, oldest first.
    async fn due_campaigns(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, SmsError>;

    async fn set_campaign_status(
        &self,
        id: &str,
        status: CampaignStatus,
        at: DateTime<Utc>,
    ) -> Result<(), SmsError>;

    /// Sets `scheduled_for`, status `scheduled` and the advisory metadata.
    async fn schedule_campaign(
        &self,
        client_id: &str,
        id: &str,
        scheduled_for: DateTime<Utc>,
        metadata: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<bool, SmsError>;

    // --- Campaign messages ---

    /// Messages of one campaign in the given status, in enqueue order.
    async fn campaign_messages(
        &self,
        campaign_id: &str,
        status: MessageStatus,
        limit: Option<usize>,
    ) -> Result<Vec<CampaignMessage>, SmsError>;

    async fn mark_message_sent(
        &self,
        message_id: &str,
        provider: &str,
        provider_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SmsError>;

    async fn mark_message_failed(
        &self,
        message_id: &str,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SmsError>;

    async fn campaign_stats(&self, campaign_id: &str) -> Result<CampaignStats, SmsError>;

    /// Applies a delivery receipt to every campaign message and transaction
    /// carrying `provider_id`. `delivered` also stamps `delivered_at`.
    /// Returns the number of rows changed.
    async fn apply_delivery_status(
        &self,
        provider_id: &str,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> Result<u64, SmsError>;

    // --- Suppression ---

    /// The subset of `phones` present in the client's suppression list.
    async fn suppressed_phones(
        &self,
        client_id: &str,
        phones: &[String],
    ) -> Result<HashSet<String>, SmsError>;

    /// Inserts an opt-out. Returns `false` when it already existed.
    async fn add_suppression(&self, entry: &SuppressionEntry) -> Result<bool, SmsError>;

    // --- Idempotency ---

    /// Whether `(key, client_id)` was recorded at or after `since`.
    async fn idempotency_seen(
        &self,
        key: &str,
        client_id: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, SmsError>;

    /// Records `(key, client_id)`, refreshing `created_at` if already present.
    async fn record_idempotency(
        &self,
        key: &str,
        client_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SmsError>;

    // --- API keys ---

    async fn insert_api_key(&self, key: &ApiKey) -> Result<(), SmsError>;

    /// Looks up a non-revoked key by its SHA-256 hex digest.
    async fn find_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>, SmsError>;

    async fn touch_api_key(&self, id: &str, at: DateTime<Utc>) -> Result<(), SmsError>;

    async fn list_api_keys(&self, client_id: &str) -> Result<Vec<ApiKey>, SmsError>;

    async fn revoke_api_key(
        &self,
        client_id: &str,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, SmsError>;

    // --- Transactions ---

    async fn insert_transaction(&self, tx: &SmsTransaction) -> Result<(), SmsError>;

    /// Number of transactions for the client created at or after `since`.
    async fn count_transactions_since(
        &self,
        client_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, SmsError>;

    /// Client that most recently messaged `phone`, if any.
    async fn latest_client_for_number(&self, phone: &str) -> Result<Option<String>, SmsError>;

    // --- Audit ---

    async fn insert_audit(&self, entry: &AuditEntry) -> Result<(), SmsError>;

    /// One page of audit entries, newest first, plus the total matching count.
    async fn list_audit(
        &self,
        actor: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<AuditEntry>, i64), SmsError>;
}
