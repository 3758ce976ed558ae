// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temporary SQLite storage for integration tests.

use std::sync::Arc;

use smsgate_config::model::StorageConfig;
use smsgate_core::{Client, Contact, NewContact, SmsError, StorageAdapter};
use smsgate_storage::SqliteStorage;
use tempfile::TempDir;

/// A migrated database in a temp directory. The directory (and the database)
/// is removed when this value is dropped.
pub struct TestDb {
    storage: Arc<SqliteStorage>,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Result<Self, SmsError> {
        let dir = TempDir::new().map_err(|e| SmsError::Storage { source: e.into() })?;
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        Ok(Self {
            storage: Arc::new(storage),
            _dir: dir,
        })
    }

    pub fn storage(&self) -> Arc<dyn StorageAdapter> {
        self.storage.clone()
    }

    /// Inserts a non-admin client on `plan` with the given allowance.
    pub async fn seed_client(
        &self,
        id: &str,
        plan: &str,
        allowance: i64,
    ) -> Result<Client, SmsError> {
        let client = Client {
            id: id.to_string(),
            name: format!("{id} Ltd"),
            plan: plan.to_string(),
            used: 0,
            allowance,
            is_admin: false,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        self.storage.create_client(&client).await?;
        Ok(client)
    }

    /// Inserts contacts given as `(phone, name, tag)`; phones must already be
    /// normalized.
    pub async fn seed_contacts(
        &self,
        client_id: &str,
        contacts: &[(&str, Option<&str>, Option<&str>)],
    ) -> Result<Vec<Contact>, SmsError> {
        let new: Vec<NewContact> = contacts
            .iter()
            .map(|(phone, name, tag)| NewContact {
                phone: phone.to_string(),
                name: name.map(str::to_string),
                tag: tag.map(str::to_string),
            })
            .collect();
        self.storage.insert_contacts(client_id, &new).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_are_visible() {
        let db = TestDb::new().await.unwrap();
        db.seed_client("acme", "starter", 10).await.unwrap();
        db.seed_contacts("acme", &[("+27821234567", Some("Sam"), Some("vip"))])
            .await
            .unwrap();

        let storage = db.storage();
        let client = storage.get_client("acme").await.unwrap().unwrap();
        assert_eq!(client.allowance, 10);
        let vip = storage.list_contacts("acme", Some("vip")).await.unwrap();
        assert_eq!(vip.len(), 1);
        assert_eq!(vip[0].name.as_deref(), Some("Sam"));
    }
}
