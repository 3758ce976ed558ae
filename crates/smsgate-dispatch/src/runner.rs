// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The campaign dispatch loop.
//!
//! Each [`DispatchLoop::run_once`] call advances every due campaign by at
//! most one batch of queued messages. Messages are sent one at a time; a
//! failing message is recorded and the batch continues. A campaign is marked
//! `sent` once no queued messages remain, so larger campaigns drain over
//! several invocations.
//!
//! The owning client's allowance is re-read before every provider call. Once
//! it is spent, the remaining messages fail with [`QUOTA_EXCEEDED`] and are
//! not counted as usage.

use std::sync::Arc;

use serde::Serialize;
use smsgate_core::{
    Campaign, CampaignMessage, CampaignStatus, Clock, MessageStatus, SmsError, StorageAdapter,
};
use tracing::{error, info, warn};

use crate::accounting::{Ledger, SendRecord};
use crate::fallback::FallbackDispatcher;

/// Error text stored on messages refused because the client's allowance ran out.
pub const QUOTA_EXCEEDED: &str = "quota exceeded";

/// Per-campaign outcome of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRunResult {
    pub campaign_id: String,
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub status: CampaignStatus,
}

/// Summary returned by the cron trigger and the `dispatch` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub processed: usize,
    pub results: Vec<CampaignRunResult>,
}

pub struct DispatchLoop {
    storage: Arc<dyn StorageAdapter>,
    dispatcher: Arc<FallbackDispatcher>,
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
    batch_size: usize,
}

impl DispatchLoop {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        dispatcher: Arc<FallbackDispatcher>,
        ledger: Arc<Ledger>,
        clock: Arc<dyn Clock>,
        batch_size: usize,
    ) -> Self {
        Self {
            storage,
            dispatcher,
            ledger,
            clock,
            batch_size: batch_size.max(1),
        }
    }

    /// Runs one iteration over all due campaigns.
    ///
    /// Fails only when the due campaigns cannot be listed. A campaign whose
    /// batch cannot be loaded is logged and skipped.
    pub async fn run_once(&self) -> Result<DispatchSummary, SmsError> {
        let due = self.storage.due_campaigns(self.clock.now()).await?;
        let mut summary = DispatchSummary::default();

        for campaign in &due {
            match self.run_campaign(campaign).await {
                Ok(result) => {
                    info!(
                        campaign_id = %result.campaign_id,
                        processed = result.processed,
                        sent = result.sent,
                        failed = result.failed,
                        status = %result.status,
                        "campaign batch processed"
                    );
                    summary.results.push(result);
                }
                Err(e) => {
                    error!(campaign_id = %campaign.id, error = %e, "campaign batch aborted");
                }
            }
        }

        summary.processed = summary.results.len();
        Ok(summary)
    }

    async fn run_campaign(&self, campaign: &Campaign) -> Result<CampaignRunResult, SmsError> {
        let batch = self
            .storage
            .campaign_messages(&campaign.id, MessageStatus::Queued, Some(self.batch_size))
            .await?;

        if batch.is_empty() {
            self.storage
                .set_campaign_status(&campaign.id, CampaignStatus::Sent, self.clock.now())
                .await?;
            return Ok(CampaignRunResult {
                campaign_id: campaign.id.clone(),
                processed: 0,
                sent: 0,
                failed: 0,
                status: CampaignStatus::Sent,
            });
        }

        if campaign.status != CampaignStatus::Sending {
            self.storage
                .set_campaign_status(&campaign.id, CampaignStatus::Sending, self.clock.now())
                .await?;
        }

        let mut sent = 0;
        for message in &batch {
            if self.deliver(campaign, message).await {
                sent += 1;
            }
        }

        let remaining = self
            .storage
            .campaign_messages(&campaign.id, MessageStatus::Queued, Some(1))
            .await?;
        let status = if remaining.is_empty() {
            self.storage
                .set_campaign_status(&campaign.id, CampaignStatus::Sent, self.clock.now())
                .await?;
            CampaignStatus::Sent
        } else {
            CampaignStatus::Sending
        };

        Ok(CampaignRunResult {
            campaign_id: campaign.id.clone(),
            processed: batch.len(),
            sent,
            failed: batch.len() - sent,
            status,
        })
    }

    /// Sends one campaign message and records the outcome on its row.
    /// Returns whether a provider accepted it.
    ///
    /// A message whose client has no allowance left is marked failed without
    /// reaching a provider. If the client record cannot be read the row is
    /// left untouched for a later run.
    pub async fn deliver(&self, campaign: &Campaign, message: &CampaignMessage) -> bool {
        match self.storage.get_client(&campaign.client_id).await {
            Ok(Some(client)) if client.used < client.allowance => {}
            Ok(Some(client)) => {
                warn!(
                    campaign_id = %campaign.id,
                    message_id = %message.id,
                    used = client.used,
                    allowance = client.allowance,
                    "campaign message refused, allowance exhausted"
                );
                self.mark_failed(message, QUOTA_EXCEEDED).await;
                return false;
            }
            Ok(None) => {
                warn!(campaign_id = %campaign.id, client_id = %campaign.client_id, "campaign owner missing");
                self.mark_failed(message, "client not found").await;
                return false;
            }
            Err(e) => {
                error!(campaign_id = %campaign.id, error = %e, "failed to load campaign owner");
                return false;
            }
        }

        match self.dispatcher.send(&message.to_number, &message.body).await {
            Ok(result) => {
                if let Err(e) = self
                    .storage
                    .mark_message_sent(
                        &message.id,
                        &result.provider_used,
                        &result.id,
                        self.clock.now(),
                    )
                    .await
                {
                    warn!(message_id = %message.id, error = %e, "failed to mark message sent");
                }
                let record = SendRecord {
                    client_id: &campaign.client_id,
                    campaign_id: Some(&campaign.id),
                    to: &message.to_number,
                    body: &message.body,
                };
                self.ledger.record_sent(&record, &result).await;
                self.ledger.add_usage(&campaign.client_id, 1).await;
                true
            }
            Err(e) => {
                warn!(campaign_id = %campaign.id, message_id = %message.id, error = %e, "campaign message failed");
                self.mark_failed(message, &e.to_string()).await;
                false
            }
        }
    }

    async fn mark_failed(&self, message: &CampaignMessage, reason: &str) {
        if let Err(e) = self
            .storage
            .mark_message_failed(&message.id, reason, self.clock.now())
            .await
        {
            warn!(message_id = %message.id, error = %e, "failed to mark message failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsgate_core::NewCampaignMessage;
    use smsgate_test_utils::{ManualClock, MockOutcome, MockSmsProvider, TestDb};

    use crate::fallback::ProviderStrategy;
    use crate::retry::RetryPolicy;

    struct Fixture {
        db: TestDb,
        clock: Arc<ManualClock>,
        provider: Arc<MockSmsProvider>,
        runner: DispatchLoop,
    }

    async fn fixture(provider: MockSmsProvider) -> Fixture {
        let db = TestDb::new().await.unwrap();
        db.seed_client("acme", "starter", 1000).await.unwrap();
        let clock = Arc::new(ManualClock::default());
        let provider = Arc::new(provider);
        let dispatcher = Arc::new(FallbackDispatcher::new(
            vec![ProviderStrategy::new(
                provider.clone(),
                RetryPolicy::new(1, std::time::Duration::ZERO),
            )],
            clock.clone(),
        ));
        let ledger = Arc::new(Ledger::new(db.storage(), clock.clone(), 0.25));
        let runner = DispatchLoop::new(db.storage(), dispatcher, ledger, clock.clone(), 100);
        Fixture {
            db,
            clock,
            provider,
            runner,
        }
    }

    async fn seed_campaign(fx: &Fixture, id: &str, count: usize, scheduled_for: Option<String>) {
        let status = if scheduled_for.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };
        let campaign = Campaign {
            id: id.to_string(),
            client_id: "acme".into(),
            name: "Launch".into(),
            message: "Hello".into(),
            status,
            scheduled_for,
            scheduling_metadata: None,
            created_at: fx.clock.timestamp(),
            updated_at: fx.clock.timestamp(),
        };
        let messages: Vec<NewCampaignMessage> = (0..count)
            .map(|i| NewCampaignMessage {
                to_number: format!("+2782{i:07}"),
                body: "Hello".into(),
            })
            .collect();
        fx.db
            .storage()
            .create_campaign(&campaign, &messages)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn large_campaign_drains_over_two_runs() {
        let fx = fixture(MockSmsProvider::new("bulksms")).await;
        seed_campaign(&fx, "c-150", 150, None).await;
        let storage = fx.db.storage();

        let first = fx.runner.run_once().await.unwrap();
        assert_eq!(first.processed, 1);
        assert_eq!(first.results[0].processed, 100);
        assert_eq!(first.results[0].status, CampaignStatus::Sending);
        let stats = storage.campaign_stats("c-150").await.unwrap();
        assert_eq!(stats.queued, 50);
        assert_eq!(stats.sent, 100);
        let campaign = storage.get_campaign("acme", "c-150").await.unwrap().unwrap();
        assert_eq!(campaign.status, CampaignStatus::Sending);

        let second = fx.runner.run_once().await.unwrap();
        assert_eq!(second.results[0].processed, 50);
        assert_eq!(second.results[0].status, CampaignStatus::Sent);
        let campaign = storage.get_campaign("acme", "c-150").await.unwrap().unwrap();
        assert_eq!(campaign.status, CampaignStatus::Sent);

        assert_eq!(fx.provider.calls(), 150);
        let client = storage.get_client("acme").await.unwrap().unwrap();
        assert_eq!(client.used, 150);

        let third = fx.runner.run_once().await.unwrap();
        assert_eq!(third.processed, 0);
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let provider = MockSmsProvider::with_script(
            "bulksms",
            vec![
                MockOutcome::accept("m1"),
                MockOutcome::fail("rejected"),
                MockOutcome::accept("m3"),
            ],
        );
        let fx = fixture(provider).await;
        seed_campaign(&fx, "c-3", 3, None).await;

        let summary = fx.runner.run_once().await.unwrap();
        let result = &summary.results[0];
        assert_eq!((result.sent, result.failed), (2, 1));
        assert_eq!(result.status, CampaignStatus::Sent);

        let storage = fx.db.storage();
        let failed = storage
            .campaign_messages("c-3", MessageStatus::Failed, None)
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].error.as_deref().unwrap_or_default().contains("rejected"));

        let stats = storage.campaign_stats("c-3").await.unwrap();
        assert_eq!(stats.sent, 2);
        assert!((stats.total_cost - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn future_campaigns_wait() {
        let fx = fixture(MockSmsProvider::new("bulksms")).await;
        let later = smsgate_core::format_timestamp(fx.clock.now() + chrono::Duration::hours(1));
        seed_campaign(&fx, "c-later", 2, Some(later)).await;

        assert_eq!(fx.runner.run_once().await.unwrap().processed, 0);
        assert_eq!(fx.provider.calls(), 0);

        fx.clock.advance(chrono::Duration::hours(2));
        let summary = fx.runner.run_once().await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.results[0].sent, 2);
    }

    #[tokio::test]
    async fn exhausted_allowance_fails_remaining_messages() {
        let fx = fixture(MockSmsProvider::new("bulksms")).await;
        let storage = fx.db.storage();
        storage.update_allowance("acme", 2).await.unwrap();
        seed_campaign(&fx, "c-over", 3, None).await;

        let summary = fx.runner.run_once().await.unwrap();
        let result = &summary.results[0];
        assert_eq!((result.sent, result.failed), (2, 1));
        assert_eq!(result.status, CampaignStatus::Sent);
        assert_eq!(fx.provider.calls(), 2);

        let client = storage.get_client("acme").await.unwrap().unwrap();
        assert_eq!(client.used, 2);
        let failed = storage
            .campaign_messages("c-over", MessageStatus::Failed, None)
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error.as_deref(), Some(QUOTA_EXCEEDED));
    }

    #[tokio::test]
    async fn row_timestamps_follow_the_clock() {
        let fx = fixture(MockSmsProvider::new("bulksms")).await;
        seed_campaign(&fx, "c-ts", 1, None).await;
        fx.clock.advance(chrono::Duration::minutes(5));
        let stamp = fx.clock.timestamp();

        fx.runner.run_once().await.unwrap();
        let storage = fx.db.storage();
        let campaign = storage.get_campaign("acme", "c-ts").await.unwrap().unwrap();
        assert_eq!(campaign.updated_at, stamp);
        let sent = storage
            .campaign_messages("c-ts", MessageStatus::Sent, None)
            .await
            .unwrap();
        assert_eq!(sent[0].updated_at, stamp);
    }

    #[tokio::test]
    async fn empty_campaign_is_marked_sent() {
        let fx = fixture(MockSmsProvider::new("bulksms")).await;
        seed_campaign(&fx, "c-empty", 0, None).await;

        let summary = fx.runner.run_once().await.unwrap();
        assert_eq!(summary.results[0].status, CampaignStatus::Sent);
        assert_eq!(summary.results[0].processed, 0);
    }
}
