// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock SMS gateway for deterministic testing.
//!
//! `MockSmsProvider` implements `SmsProvider` with a scripted queue of
//! outcomes, enabling retry and failover tests without HTTP.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use smsgate_core::{AdapterType, HealthStatus, PluginAdapter, ProviderReceipt, SmsError, SmsProvider};

/// One scripted response.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Accept(ProviderReceipt),
    Fail(String),
}

impl MockOutcome {
    /// Accepted with the given id and status `"sent"`.
    pub fn accept(id: &str) -> Self {
        Self::Accept(ProviderReceipt {
            message_id: Some(id.to_string()),
            status: Some("sent".to_string()),
        })
    }

    pub fn fail(message: &str) -> Self {
        Self::Fail(message.to_string())
    }
}

/// A mock gateway that replays scripted outcomes.
///
/// Outcomes are popped from a FIFO queue. When the queue is empty the
/// fallback applies: accept with a generated id, or fail when the mock was
/// built with [`always_failing`](Self::always_failing).
pub struct MockSmsProvider {
    name: String,
    script: Arc<Mutex<VecDeque<MockOutcome>>>,
    sent: Arc<Mutex<Vec<(String, String)>>>,
    calls: AtomicUsize,
    fail_when_empty: bool,
}

impl MockSmsProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            calls: AtomicUsize::new(0),
            fail_when_empty: false,
        }
    }

    pub fn with_script(name: &str, outcomes: Vec<MockOutcome>) -> Self {
        let mock = Self::new(name);
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(outcomes))),
            ..mock
        }
    }

    /// Fails every call once the script is exhausted.
    pub fn always_failing(name: &str) -> Self {
        Self {
            fail_when_empty: true,
            ..Self::new(name)
        }
    }

    pub async fn push(&self, outcome: MockOutcome) {
        self.script.lock().await.push_back(outcome);
    }

    /// Number of `send` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(to, body)` pairs that were accepted, in order.
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    async fn next_outcome(&self, call: usize) -> MockOutcome {
        match self.script.lock().await.pop_front() {
            Some(outcome) => outcome,
            None if self.fail_when_empty => MockOutcome::fail("mock gateway unavailable"),
            None => MockOutcome::accept(&format!("{}-{call}", self.name)),
        }
    }
}

#[async_trait]
impl PluginAdapter for MockSmsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SmsError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SmsError> {
        Ok(())
    }
}

#[async_trait]
impl SmsProvider for MockSmsProvider {
    async fn send(&self, to: &str, body: &str) -> Result<ProviderReceipt, SmsError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.next_outcome(call).await {
            MockOutcome::Accept(receipt) => {
                self.sent
                    .lock()
                    .await
                    .push((to.to_string(), body.to_string()));
                Ok(receipt)
            }
            MockOutcome::Fail(message) => Err(SmsError::provider(&self.name, message)),
        }
    }
}
