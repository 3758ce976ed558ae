// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key issuance and caller resolution.
//!
//! Keys look like `sk_` followed by 48 hex characters. Only the SHA-256 hex
//! digest is stored; the raw key is returned once, at creation.

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use smsgate_core::{ApiKey, ClientContext, Clock, SmsError, StorageAdapter};
use tracing::{info, warn};
use uuid::Uuid;

pub const KEY_PREFIX: &str = "sk_";

/// SHA-256 hex digest of a raw key.
pub fn hash_api_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

fn generate_raw_key() -> String {
    let bytes: [u8; 24] = rand::random();
    format!("{KEY_PREFIX}{}", hex::encode(bytes))
}

/// Returned from [`ApiKeyService::create`]; the only time `key` is visible.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedApiKey {
    pub key: String,
    #[serde(flatten)]
    pub meta: ApiKey,
}

pub struct ApiKeyService {
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
}

impl ApiKeyService {
    pub fn new(storage: Arc<dyn StorageAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub async fn create(&self, client_id: &str, name: Option<String>) -> Result<CreatedApiKey, SmsError> {
        if self.storage.get_client(client_id).await?.is_none() {
            return Err(SmsError::NotFound {
                entity: "client",
                id: client_id.to_string(),
            });
        }
        let key = generate_raw_key();
        let meta = ApiKey {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            name,
            key_hash: hash_api_key(&key),
            created_at: self.clock.timestamp(),
            last_used_at: None,
            revoked_at: None,
        };
        self.storage.insert_api_key(&meta).await?;
        info!(client_id, key_id = %meta.id, "api key created");
        Ok(CreatedApiKey { key, meta })
    }

    pub async fn list(&self, ctx: &ClientContext) -> Result<Vec<ApiKey>, SmsError> {
        self.storage.list_api_keys(&ctx.client_id).await
    }

    pub async fn revoke(&self, ctx: &ClientContext, id: &str) -> Result<(), SmsError> {
        if self
            .storage
            .revoke_api_key(&ctx.client_id, id, self.clock.now())
            .await?
        {
            info!(client_id = %ctx.client_id, key_id = id, "api key revoked");
            Ok(())
        } else {
            Err(SmsError::NotFound {
                entity: "api key",
                id: id.to_string(),
            })
        }
    }

    /// Resolves an `X-Api-Key` value to its client. `Ok(None)` for unknown or
    /// revoked keys.
    pub async fn resolve(&self, raw: &str) -> Result<Option<ClientContext>, SmsError> {
        let Some(key) = self.storage.find_api_key(&hash_api_key(raw)).await? else {
            return Ok(None);
        };
        if let Err(e) = self.storage.touch_api_key(&key.id, self.clock.now()).await {
            warn!(key_id = %key.id, error = %e, "failed to update api key last_used_at");
        }
        Ok(Some(ClientContext {
            client_id: key.client_id,
            is_admin: false,
        }))
    }
}
