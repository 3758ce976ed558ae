// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-plan sliding-window admission control.
//!
//! Counts the client's persisted transactions in the trailing window and
//! compares against the plan cap. Nothing is reserved, so two requests racing
//! the same window can both be admitted.

use std::sync::Arc;

use serde::Serialize;
use smsgate_config::model::RateLimitConfig;
use smsgate_core::{Clock, SmsError, StorageAdapter};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDecision {
    pub allowed: bool,
    pub retry_after_seconds: u64,
}

pub struct RateLimiter {
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        clock: Arc<dyn Clock>,
        config: RateLimitConfig,
    ) -> Self {
        Self {
            storage,
            clock,
            config,
        }
    }

    /// Messages per window for `plan`. Unknown plans get the default plan's cap.
    pub fn cap_for(&self, plan: &str) -> u32 {
        self.config
            .plans
            .get(plan)
            .or_else(|| self.config.plans.get(&self.config.default_plan))
            .copied()
            .unwrap_or(0)
    }

    pub async fn check(&self, client_id: &str, plan: &str) -> Result<RateDecision, SmsError> {
        let cap = self.cap_for(plan);
        let window = chrono::Duration::seconds(self.config.window_secs as i64);
        let since = self.clock.now() - window;
        let recent = self.storage.count_transactions_since(client_id, since).await?;

        let allowed = recent < i64::from(cap);
        debug!(client_id, plan, cap, recent, allowed, "rate limit check");

        Ok(RateDecision {
            allowed,
            retry_after_seconds: if allowed {
                0
            } else {
                self.config.retry_after_secs
            },
        })
    }

    /// Like [`check`](Self::check) but turns a denial into [`SmsError::RateLimited`].
    pub async fn admit(&self, client_id: &str, plan: &str) -> Result<(), SmsError> {
        let decision = self.check(client_id, plan).await?;
        if decision.allowed {
            Ok(())
        } else {
            Err(SmsError::RateLimited {
                retry_after_seconds: decision.retry_after_seconds,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsgate_core::{MessageStatus, SmsTransaction};
    use smsgate_test_utils::{ManualClock, TestDb};

    async fn record_sends(
        storage: &Arc<dyn StorageAdapter>,
        clock: &ManualClock,
        batch: &str,
        n: usize,
    ) {
        for i in 0..n {
            storage
                .insert_transaction(&SmsTransaction {
                    id: format!("tx-{batch}-{i}"),
                    client_id: "acme".into(),
                    campaign_id: None,
                    to_number: "+27821234567".into(),
                    message: "hi".into(),
                    status: MessageStatus::Sent,
                    cost: 0.25,
                    provider: Some("bulksms".into()),
                    provider_id: Some(format!("p{i}")),
                    created_at: clock.timestamp(),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn thirty_first_send_in_window_is_denied() {
        let db = TestDb::new().await.unwrap();
        db.seed_client("acme", "starter", 1000).await.unwrap();
        let clock = Arc::new(ManualClock::default());
        let limiter = RateLimiter::new(db.storage(), clock.clone(), RateLimitConfig::default());

        record_sends(&db.storage(), &clock, "a", 29).await;
        assert!(limiter.check("acme", "starter").await.unwrap().allowed);

        record_sends(&db.storage(), &clock, "b", 1).await;
        let decision = limiter.check("acme", "starter").await.unwrap();
        assert_eq!(
            decision,
            RateDecision {
                allowed: false,
                retry_after_seconds: 60
            }
        );
        assert!(matches!(
            limiter.admit("acme", "starter").await,
            Err(SmsError::RateLimited {
                retry_after_seconds: 60
            })
        ));
    }

    #[tokio::test]
    async fn window_slides() {
        let db = TestDb::new().await.unwrap();
        db.seed_client("acme", "starter", 1000).await.unwrap();
        let clock = Arc::new(ManualClock::default());
        let limiter = RateLimiter::new(db.storage(), clock.clone(), RateLimitConfig::default());

        record_sends(&db.storage(), &clock, "a", 30).await;
        assert!(!limiter.check("acme", "starter").await.unwrap().allowed);

        clock.advance(chrono::Duration::seconds(61));
        assert!(limiter.check("acme", "starter").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn unknown_plan_uses_default_cap() {
        let db = TestDb::new().await.unwrap();
        let limiter = RateLimiter::new(
            db.storage(),
            Arc::new(ManualClock::default()),
            RateLimitConfig::default(),
        );
        assert_eq!(limiter.cap_for("enterprise-gold"), 30);
        assert_eq!(limiter.cap_for("pro"), 300);
    }
}
