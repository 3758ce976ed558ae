// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator actions on tenant accounts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use smsgate_core::{AuditEntry, Client, ClientContext, Clock, SmsError, StorageAdapter};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceUpdate {
    pub client_id: String,
    pub allowance: i64,
}

/// Page size used when the caller does not ask for one.
pub const DEFAULT_AUDIT_PAGE: usize = 50;
/// Largest page the audit listing returns.
pub const MAX_AUDIT_PAGE: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    /// Only entries written by this actor.
    #[serde(default)]
    pub admin_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub items: Vec<AuditEntry>,
    pub total: i64,
    pub limit: usize,
    pub offset: usize,
}

pub struct AdminService {
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
}

impl AdminService {
    pub fn new(storage: Arc<dyn StorageAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Sets a client's allowance. Admin callers only. The audit entry is
    /// best-effort.
    pub async fn update_allowance(
        &self,
        ctx: &ClientContext,
        update: AllowanceUpdate,
    ) -> Result<Client, SmsError> {
        if !ctx.is_admin {
            return Err(SmsError::Forbidden("admin access required".into()));
        }
        if update.allowance < 0 {
            return Err(SmsError::validation("`allowance` must not be negative"));
        }

        if !self
            .storage
            .update_allowance(&update.client_id, update.allowance)
            .await?
        {
            return Err(SmsError::NotFound {
                entity: "client",
                id: update.client_id,
            });
        }
        info!(actor = %ctx.client_id, client_id = %update.client_id, allowance = update.allowance, "allowance updated");

        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            actor: ctx.client_id.clone(),
            action: "client.allowance.update".to_string(),
            target: Some(update.client_id.clone()),
            details: Some(json!({ "allowance": update.allowance })),
            created_at: self.clock.timestamp(),
        };
        if let Err(e) = self.storage.insert_audit(&entry).await {
            warn!(client_id = %update.client_id, error = %e, "failed to write audit entry");
        }

        self.storage
            .get_client(&update.client_id)
            .await?
            .ok_or_else(|| SmsError::NotFound {
                entity: "client",
                id: update.client_id,
            })
    }

    /// Pages through the audit trail, newest first. Admin callers only.
    /// `limit` is clamped to `1..=MAX_AUDIT_PAGE`.
    pub async fn audit_logs(
        &self,
        ctx: &ClientContext,
        query: AuditQuery,
    ) -> Result<AuditPage, SmsError> {
        if !ctx.is_admin {
            return Err(SmsError::Forbidden("admin access required".into()));
        }
        let limit = query
            .limit
            .unwrap_or(DEFAULT_AUDIT_PAGE)
            .clamp(1, MAX_AUDIT_PAGE);
        let offset = query.offset.unwrap_or(0);
        let actor = query.admin_id.as_deref().filter(|a| !a.is_empty());

        let (items, total) = self.storage.list_audit(actor, limit, offset).await?;
        Ok(AuditPage {
            items,
            total,
            limit,
            offset,
        })
    }
}
