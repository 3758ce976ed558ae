// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered provider failover.
//!
//! [`FallbackDispatcher`] walks its strategies in order, running each
//! provider under its own [`RetryPolicy`]. The first success wins. When every
//! strategy is exhausted the caller sees only the last provider's last error.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use smsgate_config::model::DispatchConfig;
use smsgate_core::{Clock, SmsError, SmsProvider};
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;

/// One provider plus the retry policy used for it.
#[derive(Clone)]
pub struct ProviderStrategy {
    pub provider: Arc<dyn SmsProvider>,
    pub policy: RetryPolicy,
}

impl ProviderStrategy {
    pub fn new(provider: Arc<dyn SmsProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }
}

/// Normalized outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub id: String,
    pub status: String,
    pub provider_used: String,
}

pub struct FallbackDispatcher {
    strategies: Vec<ProviderStrategy>,
    clock: Arc<dyn Clock>,
}

impl FallbackDispatcher {
    pub fn new(strategies: Vec<ProviderStrategy>, clock: Arc<dyn Clock>) -> Self {
        Self { strategies, clock }
    }

    /// Primary then secondary, with the attempt budgets from `[dispatch]`.
    pub fn primary_secondary(
        primary: Arc<dyn SmsProvider>,
        secondary: Arc<dyn SmsProvider>,
        config: &DispatchConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            vec![
                ProviderStrategy::new(
                    primary,
                    RetryPolicy::new(
                        config.primary_attempts,
                        Duration::from_millis(config.primary_base_delay_ms),
                    ),
                ),
                ProviderStrategy::new(
                    secondary,
                    RetryPolicy::new(
                        config.secondary_attempts,
                        Duration::from_millis(config.secondary_base_delay_ms),
                    ),
                ),
            ],
            clock,
        )
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.provider.name()).collect()
    }

    /// Sends one message, failing over across providers.
    pub async fn send(&self, to: &str, body: &str) -> Result<DispatchResult, SmsError> {
        let mut last_err = None;

        for (idx, strategy) in self.strategies.iter().enumerate() {
            let provider = strategy.provider.as_ref();
            let name = provider.name();
            let result = strategy
                .policy
                .run(name, |attempt| {
                    debug!(provider = name, attempt = attempt + 1, "dispatching message");
                    provider.send(to, body)
                })
                .await;

            match result {
                Ok(receipt) => {
                    if idx > 0 {
                        info!(provider = name, "message sent via fallback provider");
                    }
                    let id = receipt
                        .message_id
                        .unwrap_or_else(|| self.clock.now().timestamp_millis().to_string());
                    return Ok(DispatchResult {
                        id,
                        status: receipt.status.unwrap_or_else(|| "sent".to_string()),
                        provider_used: name.to_string(),
                    });
                }
                Err(e) => {
                    warn!(provider = name, error = %e, "provider exhausted, failing over");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| SmsError::Internal("no SMS providers configured".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsgate_core::ProviderReceipt;
    use smsgate_test_utils::{ManualClock, MockOutcome, MockSmsProvider};

    fn dispatcher(
        primary: Arc<MockSmsProvider>,
        secondary: Arc<MockSmsProvider>,
    ) -> FallbackDispatcher {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        FallbackDispatcher::primary_secondary(primary, secondary, &DispatchConfig::default(), clock)
    }

    #[tokio::test(start_paused = true)]
    async fn primary_success_uses_primary_once() {
        let primary = Arc::new(MockSmsProvider::with_script(
            "bulksms",
            vec![MockOutcome::accept("b-1")],
        ));
        let secondary = Arc::new(MockSmsProvider::new("africastalking"));
        let result = dispatcher(primary.clone(), secondary.clone())
            .send("+27821234567", "hi")
            .await
            .unwrap();

        assert_eq!(result.provider_used, "bulksms");
        assert_eq!(result.id, "b-1");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fails_over_after_three_primary_failures() {
        let primary = Arc::new(MockSmsProvider::always_failing("bulksms"));
        let secondary = Arc::new(MockSmsProvider::with_script(
            "africastalking",
            vec![MockOutcome::accept("at-1")],
        ));
        let result = dispatcher(primary.clone(), secondary.clone())
            .send("+27821234567", "hi")
            .await
            .unwrap();

        assert_eq!(result.provider_used, "africastalking");
        assert_eq!(primary.calls() + secondary.calls(), 4);
        assert_eq!(primary.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn total_failure_reports_secondary_error() {
        let primary = Arc::new(MockSmsProvider::always_failing("bulksms"));
        let secondary = Arc::new(MockSmsProvider::always_failing("africastalking"));
        let err = dispatcher(primary.clone(), secondary.clone())
            .send("+27821234567", "hi")
            .await
            .unwrap_err();

        assert!(matches!(err, SmsError::Provider { ref provider, .. } if provider == "africastalking"));
        assert_eq!(primary.calls(), 3);
        assert_eq!(secondary.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_fields_are_synthesized() {
        let primary = Arc::new(MockSmsProvider::always_failing("bulksms"));
        let secondary = Arc::new(MockSmsProvider::with_script(
            "africastalking",
            vec![MockOutcome::Accept(ProviderReceipt::default())],
        ));
        let clock = Arc::new(ManualClock::default());
        let expected_id = clock.now().timestamp_millis().to_string();
        let dispatcher = FallbackDispatcher::primary_secondary(
            primary,
            secondary,
            &DispatchConfig::default(),
            clock,
        );

        let result = dispatcher.send("+1", "x").await.unwrap();
        assert_eq!(result.status, "sent");
        assert_eq!(result.id, expected_id);
    }

    #[tokio::test]
    async fn empty_strategy_list_is_internal_error() {
        let dispatcher = FallbackDispatcher::new(Vec::new(), Arc::new(ManualClock::default()));
        assert!(matches!(
            dispatcher.send("+1", "x").await,
            Err(SmsError::Internal(_))
        ));
    }
}
