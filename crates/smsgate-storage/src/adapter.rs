// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use smsgate_config::model::StorageConfig;
use smsgate_core::{
    AdapterType, ApiKey, AuditEntry, Campaign, CampaignMessage, CampaignStats, CampaignStatus,
    Client, Contact, HealthStatus, MessageStatus, MessageTemplate, NewCampaignMessage, NewContact,
    PluginAdapter, SmsError, SmsTransaction, StorageAdapter, SuppressionEntry, Tag,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The database is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, SmsError> {
        self.db.get().ok_or_else(|| SmsError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), SmsError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SmsError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SmsError> {
        if self.db.get().is_some() {
            self.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SmsError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| SmsError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SmsError> {
        self.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Clients ---

    async fn create_client(&self, client: &Client) -> Result<(), SmsError> {
        queries::clients::create_client(self.db()?, client).await
    }

    async fn get_client(&self, id: &str) -> Result<Option<Client>, SmsError> {
        queries::clients::get_client(self.db()?, id).await
    }

    async fn increment_usage(&self, client_id: &str, by: i64) -> Result<(), SmsError> {
        queries::clients::increment_usage(self.db()?, client_id, by).await
    }

    async fn update_allowance(&self, client_id: &str, allowance: i64) -> Result<bool, SmsError> {
        queries::clients::update_allowance(self.db()?, client_id, allowance).await
    }

    // --- Contacts and tags ---

    async fn insert_contacts(
        &self,
        client_id: &str,
        contacts: &[NewContact],
    ) -> Result<Vec<Contact>, SmsError> {
        queries::contacts::insert_contacts(self.db()?, client_id, contacts).await
    }

    async fn list_contacts(
        &self,
        client_id: &str,
        tag: Option<&str>,
    ) -> Result<Vec<Contact>, SmsError> {
        queries::contacts::list_contacts(self.db()?, client_id, tag).await
    }

    async fn update_contact(
        &self,
        client_id: &str,
        contact_id: &str,
        name: Option<&str>,
        tag: Option<&str>,
    ) -> Result<Option<Contact>, SmsError> {
        queries::contacts::update_contact(self.db()?, client_id, contact_id, name, tag).await
    }

    async fn delete_contact(&self, client_id: &str, contact_id: &str) -> Result<bool, SmsError> {
        queries::contacts::delete_contact(self.db()?, client_id, contact_id).await
    }

    async fn delete_contacts(
        &self,
        client_id: &str,
        contact_ids: &[String],
    ) -> Result<u64, SmsError> {
        queries::contacts::delete_contacts(self.db()?, client_id, contact_ids).await
    }

    async fn ensure_tag(&self, client_id: &str, name: &str) -> Result<String, SmsError> {
        queries::contacts::ensure_tag(self.db()?, client_id, name).await
    }

    async fn link_contact_tag(&self, contact_id: &str, tag_id: &str) -> Result<(), SmsError> {
        queries::contacts::link_contact_tag(self.db()?, contact_id, tag_id).await
    }

    async fn list_tags(&self, client_id: &str) -> Result<Vec<Tag>, SmsError> {
        queries::contacts::list_tags(self.db()?, client_id).await
    }

    // --- Templates ---

    async fn insert_template(&self, template: &MessageTemplate) -> Result<(), SmsError> {
        queries::templates::insert_template(self.db()?, template).await
    }

    async fn list_templates(&self, client_id: &str) -> Result<Vec<MessageTemplate>, SmsError> {
        queries::templates::list_templates(self.db()?, client_id).await
    }

    // --- Campaigns ---

    async fn create_campaign(
        &self,
        campaign: &Campaign,
        messages: &[NewCampaignMessage],
    ) -> Result<(), SmsError> {
        queries::campaigns::create_campaign(self.db()?, campaign, messages).await
    }

    async fn get_campaign(&self, client_id: &str, id: &str) -> Result<Option<Campaign>, SmsError> {
        queries::campaigns::get_campaign(self.db()?, client_id, id).await
    }

    async fn list_campaigns(&self, client_id: &str) -> Result<Vec<Campaign>, SmsError> {
        queries::campaigns::list_campaigns(self.db()?, client_id).await
    }

    async fn due_campaigns(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, SmsError> {
        queries::campaigns::due_campaigns(self.db()?, now).await
    }

    async fn set_campaign_status(
        &self,
        id: &str,
        status: CampaignStatus,
        at: DateTime<Utc>,
    ) -> Result<(), SmsError> {
        queries::campaigns::set_campaign_status(self.db()?, id, status, at).await
    }

    async fn schedule_campaign(
        &self,
        client_id: &str,
        id: &str,
        scheduled_for: DateTime<Utc>,
        metadata: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<bool, SmsError> {
        queries::campaigns::schedule_campaign(
            self.db()?,
            client_id,
            id,
            scheduled_for,
            metadata,
            at,
        )
        .await
    }

    // --- Campaign messages ---

    async fn campaign_messages(
        &self,
        campaign_id: &str,
        status: MessageStatus,
        limit: Option<usize>,
    ) -> Result<Vec<CampaignMessage>, SmsError> {
        queries::campaigns::campaign_messages(self.db()?, campaign_id, status, limit).await
    }

    async fn mark_message_sent(
        &self,
        message_id: &str,
        provider: &str,
        provider_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SmsError> {
        queries::campaigns::mark_message_sent(self.db()?, message_id, provider, provider_id, at)
            .await
    }

    async fn mark_message_failed(
        &self,
        message_id: &str,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SmsError> {
        queries::campaigns::mark_message_failed(self.db()?, message_id, error, at).await
    }

    async fn campaign_stats(&self, campaign_id: &str) -> Result<CampaignStats, SmsError> {
        queries::campaigns::campaign_stats(self.db()?, campaign_id).await
    }

    async fn apply_delivery_status(
        &self,
        provider_id: &str,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> Result<u64, SmsError> {
        queries::campaigns::apply_delivery_status(self.db()?, provider_id, status, at).await
    }

    // --- Suppression ---

    async fn suppressed_phones(
        &self,
        client_id: &str,
        phones: &[String],
    ) -> Result<HashSet<String>, SmsError> {
        queries::suppression::suppressed_phones(self.db()?, client_id, phones).await
    }

    async fn add_suppression(&self, entry: &SuppressionEntry) -> Result<bool, SmsError> {
        queries::suppression::add_suppression(self.db()?, entry).await
    }

    // --- Idempotency ---

    async fn idempotency_seen(
        &self,
        key: &str,
        client_id: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, SmsError> {
        queries::idempotency::idempotency_seen(self.db()?, key, client_id, since).await
    }

    async fn record_idempotency(
        &self,
        key: &str,
        client_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SmsError> {
        queries::idempotency::record_idempotency(self.db()?, key, client_id, at).await
    }

    // --- API keys ---

    async fn insert_api_key(&self, key: &ApiKey) -> Result<(), SmsError> {
        queries::api_keys::insert_api_key(self.db()?, key).await
    }

    async fn find_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>, SmsError> {
        queries::api_keys::find_api_key(self.db()?, key_hash).await
    }

    async fn touch_api_key(&self, id: &str, at: DateTime<Utc>) -> Result<(), SmsError> {
        queries::api_keys::touch_api_key(self.db()?, id, at).await
    }

    async fn list_api_keys(&self, client_id: &str) -> Result<Vec<ApiKey>, SmsError> {
        queries::api_keys::list_api_keys(self.db()?, client_id).await
    }

    async fn revoke_api_key(
        &self,
        client_id: &str,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, SmsError> {
        queries::api_keys::revoke_api_key(self.db()?, client_id, id, at).await
    }

    // --- Transactions ---

    async fn insert_transaction(&self, tx: &SmsTransaction) -> Result<(), SmsError> {
        queries::transactions::insert_transaction(self.db()?, tx).await
    }

    async fn count_transactions_since(
        &self,
        client_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, SmsError> {
        queries::transactions::count_transactions_since(self.db()?, client_id, since).await
    }

    async fn latest_client_for_number(&self, phone: &str) -> Result<Option<String>, SmsError> {
        queries::transactions::latest_client_for_number(self.db()?, phone).await
    }

    // --- Audit ---

    async fn insert_audit(&self, entry: &AuditEntry) -> Result<(), SmsError> {
        queries::audit::insert_audit(self.db()?, entry).await
    }

    async fn list_audit(
        &self,
        actor: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<AuditEntry>, i64), SmsError> {
        queries::audit::list_audit(self.db()?, actor, limit, offset).await
    }
}
