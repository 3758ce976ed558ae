// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign creation, scheduling, reporting and resend.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use smsgate_core::{
    Campaign, CampaignMessage, CampaignStats, CampaignStatus, ClientContext, Clock, MessageStatus,
    NewCampaignMessage, PhoneNormalizer, SmsError, StorageAdapter, compile_template,
    parse_rfc3339,
};
use tracing::info;
use uuid::Uuid;

use crate::recipients::{InvalidRecipient, normalize_recipients};
use crate::runner::DispatchLoop;
use crate::suppression::SuppressionFilter;
use crate::validate;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub recipients: Option<Vec<String>>,
    #[serde(default)]
    pub tag: Option<String>,
    /// RFC 3339 instant. Absent means "dispatch on the next loop run".
    #[serde(default)]
    pub schedule_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignCreated {
    pub campaign: Campaign,
    pub queued: usize,
    pub suppressed: usize,
    pub invalid: Vec<InvalidRecipient>,
    /// Recipients dropped because the template referenced fields they lack.
    pub skipped: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub campaign_id: String,
    pub scheduled_for: String,
    #[serde(default)]
    pub time_window_start: Option<String>,
    #[serde(default)]
    pub time_window_end: Option<String>,
    #[serde(default)]
    pub throttle_rate: Option<u32>,
}

impl ScheduleRequest {
    /// Advisory settings stored alongside the campaign; never enforced.
    fn metadata(&self) -> Option<serde_json::Value> {
        if self.time_window_start.is_none()
            && self.time_window_end.is_none()
            && self.throttle_rate.is_none()
        {
            return None;
        }
        let mut meta = serde_json::Map::new();
        if let Some(start) = &self.time_window_start {
            meta.insert("timeWindowStart".into(), json!(start));
        }
        if let Some(end) = &self.time_window_end {
            meta.insert("timeWindowEnd".into(), json!(end));
        }
        if let Some(rate) = self.throttle_rate {
            meta.insert("throttleRate".into(), json!(rate));
        }
        Some(serde_json::Value::Object(meta))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDetails {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub stats: CampaignStats,
    pub failed_messages: Vec<CampaignMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResendOutcome {
    pub resent: usize,
    pub failed: usize,
}

pub struct CampaignService {
    storage: Arc<dyn StorageAdapter>,
    suppression: Arc<SuppressionFilter>,
    runner: Arc<DispatchLoop>,
    clock: Arc<dyn Clock>,
    normalizer: PhoneNormalizer,
}

impl CampaignService {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        suppression: Arc<SuppressionFilter>,
        runner: Arc<DispatchLoop>,
        clock: Arc<dyn Clock>,
        normalizer: PhoneNormalizer,
    ) -> Self {
        Self {
            storage,
            suppression,
            runner,
            clock,
            normalizer,
        }
    }

    /// Resolves targets (explicit recipients, else tag, else every contact),
    /// compiles one body per recipient and enqueues them all as `queued`.
    ///
    /// Refused with [`SmsError::QuotaExceeded`] when the queued messages would
    /// take the client past its allowance.
    pub async fn create(
        &self,
        ctx: &ClientContext,
        req: CreateCampaignRequest,
    ) -> Result<CampaignCreated, SmsError> {
        validate::length("name", &req.name, 1, 100)?;
        validate::message(&req.message)?;
        validate::optional("tag", req.tag.as_deref(), 60)?;

        let scheduled_for = match req.schedule_at.as_deref() {
            Some(raw) => Some(parse_rfc3339(raw).ok_or_else(|| {
                SmsError::validation("`scheduleAt` must be an RFC 3339 timestamp")
            })?),
            None => None,
        };

        // (raw phone, merge-field name) in resolution order.
        let targets: Vec<(String, Option<String>)> = match &req.recipients {
            Some(list) if !list.is_empty() => list.iter().map(|p| (p.clone(), None)).collect(),
            _ => self
                .storage
                .list_contacts(&ctx.client_id, req.tag.as_deref())
                .await?
                .into_iter()
                .map(|c| (c.phone, c.name))
                .collect(),
        };

        let (phones, invalid) =
            normalize_recipients(&self.normalizer, targets.iter().map(|(p, _)| p.as_str()));
        let mut names: HashMap<String, Option<String>> = HashMap::new();
        for (raw, name) in &targets {
            names
                .entry(self.normalizer.normalize(raw))
                .or_insert_with(|| name.clone());
        }

        let filtered = self.suppression.filter(&ctx.client_id, &phones).await?;

        let mut messages = Vec::with_capacity(filtered.allowed.len());
        let mut skipped = 0;
        for phone in &filtered.allowed {
            let mut fields = HashMap::from([("phone".to_string(), phone.clone())]);
            if let Some(Some(name)) = names.get(phone) {
                fields.insert("name".to_string(), name.clone());
            }
            let compiled = compile_template(&req.message, &fields);
            if compiled.is_complete() {
                messages.push(NewCampaignMessage {
                    to_number: phone.clone(),
                    body: compiled.text,
                });
            } else {
                skipped += 1;
            }
        }

        let client = self
            .storage
            .get_client(&ctx.client_id)
            .await?
            .ok_or_else(|| SmsError::NotFound {
                entity: "client",
                id: ctx.client_id.clone(),
            })?;
        if client.used + messages.len() as i64 > client.allowance {
            return Err(SmsError::QuotaExceeded {
                used: client.used,
                allowance: client.allowance,
            });
        }

        let now = self.clock.timestamp();
        let campaign = Campaign {
            id: Uuid::new_v4().to_string(),
            client_id: ctx.client_id.clone(),
            name: req.name,
            message: req.message,
            status: if scheduled_for.is_some() {
                CampaignStatus::Scheduled
            } else {
                CampaignStatus::Draft
            },
            scheduled_for: scheduled_for.map(smsgate_core::format_timestamp),
            scheduling_metadata: None,
            created_at: now.clone(),
            updated_at: now,
        };
        self.storage.create_campaign(&campaign, &messages).await?;

        info!(
            client_id = %ctx.client_id,
            campaign_id = %campaign.id,
            queued = messages.len(),
            suppressed = filtered.suppressed.len(),
            skipped,
            "campaign created"
        );

        Ok(CampaignCreated {
            campaign,
            queued: messages.len(),
            suppressed: filtered.suppressed.len(),
            invalid,
            skipped,
        })
    }

    pub async fn schedule(
        &self,
        ctx: &ClientContext,
        req: ScheduleRequest,
    ) -> Result<Campaign, SmsError> {
        let at = parse_rfc3339(&req.scheduled_for)
            .ok_or_else(|| SmsError::validation("`scheduledFor` must be an RFC 3339 timestamp"))?;

        let updated = self
            .storage
            .schedule_campaign(
                &ctx.client_id,
                &req.campaign_id,
                at,
                req.metadata(),
                self.clock.now(),
            )
            .await?;
        if !updated {
            return Err(not_found(&req.campaign_id));
        }
        self.load(ctx, &req.campaign_id).await
    }

    /// The caller's campaigns, newest first.
    pub async fn list(&self, ctx: &ClientContext) -> Result<Vec<Campaign>, SmsError> {
        self.storage.list_campaigns(&ctx.client_id).await
    }

    pub async fn details(&self, ctx: &ClientContext, id: &str) -> Result<CampaignDetails, SmsError> {
        let campaign = self.load(ctx, id).await?;
        let stats = self.storage.campaign_stats(id).await?;
        let failed_messages = self
            .storage
            .campaign_messages(id, MessageStatus::Failed, None)
            .await?;
        Ok(CampaignDetails {
            campaign,
            stats,
            failed_messages,
        })
    }

    /// Re-sends every `failed` message of the campaign through the same
    /// per-message path as the dispatch loop.
    pub async fn resend_failed(&self, ctx: &ClientContext, id: &str) -> Result<ResendOutcome, SmsError> {
        let campaign = self.load(ctx, id).await?;
        let failed = self
            .storage
            .campaign_messages(id, MessageStatus::Failed, None)
            .await?;

        let mut outcome = ResendOutcome { resent: 0, failed: 0 };
        for message in &failed {
            if self.runner.deliver(&campaign, message).await {
                outcome.resent += 1;
            } else {
                outcome.failed += 1;
            }
        }
        info!(campaign_id = %id, resent = outcome.resent, failed = outcome.failed, "failed messages resent");
        Ok(outcome)
    }

    async fn load(&self, ctx: &ClientContext, id: &str) -> Result<Campaign, SmsError> {
        self.storage
            .get_campaign(&ctx.client_id, id)
            .await?
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: &str) -> SmsError {
    SmsError::NotFound {
        entity: "campaign",
        id: id.to_string(),
    }
}
