// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Direct and templated-batch sends.
//!
//! Both paths run the same admission sequence before touching a provider:
//! idempotency (direct only), quota, rate limit, then suppression. Every
//! dispatch attempt leaves an `sms_transactions` row, and usage grows by the
//! number of messages a provider accepted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smsgate_core::{Client, ClientContext, PhoneNormalizer, SmsError, StorageAdapter, compile_template};
use tracing::info;

use crate::accounting::{Ledger, SendRecord};
use crate::batch::{self, BatchPreview, BatchRequest};
use crate::fallback::FallbackDispatcher;
use crate::idempotency::IdempotencyGuard;
use crate::rate_limit::RateLimiter;
use crate::recipients::{InvalidRecipient, normalize_recipients};
use crate::suppression::SuppressionFilter;
use crate::validate;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub recipients: Option<Vec<String>>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientResult {
    pub to: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSummary {
    /// Whether the request carried an idempotency key.
    pub idempotent: bool,
    pub sent: usize,
    pub failed: usize,
    pub suppressed: Vec<String>,
    pub invalid: Vec<InvalidRecipient>,
    pub results: Vec<RecipientResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SendOutcome {
    /// The key was already processed inside the window; nothing was sent.
    #[serde(rename_all = "camelCase")]
    Duplicate {
        idempotent: bool,
        already_processed: bool,
    },
    Completed(SendSummary),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecipient {
    pub phone: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub sent: usize,
    pub failed: usize,
    pub skipped: Vec<SkippedRecipient>,
    pub suppressed: Vec<String>,
    pub invalid: Vec<InvalidRecipient>,
    pub results: Vec<RecipientResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Preview(BatchPreview),
    Committed(BatchSummary),
}

pub struct SendService {
    storage: Arc<dyn StorageAdapter>,
    dispatcher: Arc<FallbackDispatcher>,
    limiter: Arc<RateLimiter>,
    guard: Arc<IdempotencyGuard>,
    suppression: Arc<SuppressionFilter>,
    ledger: Arc<Ledger>,
    normalizer: PhoneNormalizer,
}

impl SendService {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        dispatcher: Arc<FallbackDispatcher>,
        limiter: Arc<RateLimiter>,
        guard: Arc<IdempotencyGuard>,
        suppression: Arc<SuppressionFilter>,
        ledger: Arc<Ledger>,
        normalizer: PhoneNormalizer,
    ) -> Self {
        Self {
            storage,
            dispatcher,
            limiter,
            guard,
            suppression,
            ledger,
            normalizer,
        }
    }

    /// Sends one body to one or more recipients.
    pub async fn send(
        &self,
        ctx: &ClientContext,
        req: SendRequest,
        idempotency_key: Option<&str>,
    ) -> Result<SendOutcome, SmsError> {
        validate::message(&req.message)?;

        let raw: Vec<String> = match (req.recipients, req.to) {
            (Some(list), _) if !list.is_empty() => list,
            (_, Some(to)) => vec![to],
            _ => return Err(SmsError::validation("provide `to` or `recipients`")),
        };
        let (phones, invalid) = normalize_recipients(&self.normalizer, raw.iter().map(String::as_str));
        if phones.is_empty() {
            return Err(SmsError::validation("no valid recipients"));
        }

        if let Some(key) = idempotency_key {
            if !self.guard.should_process(key, &ctx.client_id).await? {
                return Ok(SendOutcome::Duplicate {
                    idempotent: true,
                    already_processed: true,
                });
            }
        }

        let client = self.admit(ctx, phones.len()).await?;
        let filtered = self.suppression.filter(&client.id, &phones).await?;

        let mut results = Vec::with_capacity(filtered.allowed.len());
        for phone in &filtered.allowed {
            results.push(self.deliver(&client.id, phone, &req.message).await);
        }
        let sent = results.iter().filter(|r| r.status != "failed").count();
        self.ledger.add_usage(&client.id, sent as i64).await;

        if let Some(key) = idempotency_key {
            self.guard.record(key, &client.id).await;
        }

        info!(client_id = %client.id, sent, failed = results.len() - sent, "direct send complete");
        Ok(SendOutcome::Completed(SendSummary {
            idempotent: idempotency_key.is_some(),
            sent,
            failed: results.len() - sent,
            suppressed: filtered.suppressed,
            invalid,
            results,
        }))
    }

    /// Previews or commits a templated send from a CSV file.
    pub async fn batch(&self, ctx: &ClientContext, req: BatchRequest) -> Result<BatchOutcome, SmsError> {
        validate::length("message", &req.message, 1, usize::MAX)?;
        let parsed = batch::parse_batch_csv(&req.csv, &self.normalizer)?;
        if !req.commit {
            return Ok(BatchOutcome::Preview(batch::preview(parsed, &req.message)));
        }

        let client = self.admit(ctx, parsed.recipients.len()).await?;
        let phones: Vec<String> = parsed.recipients.iter().map(|r| r.phone.clone()).collect();
        let filtered = self.suppression.filter(&client.id, &phones).await?;

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for recipient in &parsed.recipients {
            if filtered.suppressed.contains(&recipient.phone) {
                continue;
            }
            let compiled = compile_template(&req.message, &recipient.fields);
            if !compiled.is_complete() {
                skipped.push(SkippedRecipient {
                    phone: recipient.phone.clone(),
                    missing: compiled.missing,
                });
                continue;
            }
            results.push(self.deliver(&client.id, &recipient.phone, &compiled.text).await);
        }
        let sent = results.iter().filter(|r| r.status != "failed").count();
        self.ledger.add_usage(&client.id, sent as i64).await;

        info!(client_id = %client.id, sent, skipped = skipped.len(), "batch send complete");
        Ok(BatchOutcome::Committed(BatchSummary {
            sent,
            failed: results.len() - sent,
            skipped,
            suppressed: filtered.suppressed,
            invalid: parsed.invalid,
            results,
        }))
    }

    /// Quota then rate limit. Returns the caller's client record.
    async fn admit(&self, ctx: &ClientContext, count: usize) -> Result<Client, SmsError> {
        let client = self
            .storage
            .get_client(&ctx.client_id)
            .await?
            .ok_or_else(|| SmsError::NotFound {
                entity: "client",
                id: ctx.client_id.clone(),
            })?;

        if client.used + count as i64 > client.allowance {
            return Err(SmsError::QuotaExceeded {
                used: client.used,
                allowance: client.allowance,
            });
        }
        self.limiter.admit(&client.id, &client.plan).await?;
        Ok(client)
    }

    async fn deliver(&self, client_id: &str, to: &str, body: &str) -> RecipientResult {
        let record = SendRecord {
            client_id,
            campaign_id: None,
            to,
            body,
        };
        match self.dispatcher.send(to, body).await {
            Ok(result) => {
                self.ledger.record_sent(&record, &result).await;
                RecipientResult {
                    to: to.to_string(),
                    status: result.status.clone(),
                    provider: Some(result.provider_used),
                    provider_id: Some(result.id),
                    error: None,
                }
            }
            Err(e) => {
                self.ledger.record_failed(&record).await;
                RecipientResult {
                    to: to.to_string(),
                    status: "failed".to_string(),
                    provider: None,
                    provider_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
