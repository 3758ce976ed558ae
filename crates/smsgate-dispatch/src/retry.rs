// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff with jitter for a single provider.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use smsgate_core::SmsError;
use tracing::warn;

/// Draws the jitter added to a backoff delay, given the base delay.
pub type JitterFn = Arc<dyn Fn(Duration) -> Duration + Send + Sync>;

/// Attempt budget and backoff schedule applied to one provider.
///
/// The delay before retry `n` (0-based) is `base_delay * 2^n` plus a jitter
/// drawn from `[0, base_delay)`. No delay follows the final attempt.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    jitter: JitterFn,
}

impl RetryPolicy {
    /// Policy with uniform random jitter.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            jitter: Arc::new(uniform_jitter),
        }
    }

    /// Replaces the jitter source, mainly so tests can make delays exact.
    pub fn with_jitter(mut self, jitter: JitterFn) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn without_jitter(self) -> Self {
        self.with_jitter(Arc::new(|_| Duration::ZERO))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff before the retry that follows failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor) + (self.jitter)(self.base_delay)
    }

    /// Runs `op` until it succeeds or the budget is spent, returning the last
    /// error in the latter case. `op` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, SmsError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SmsError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt + 1 >= self.max_attempts {
                        warn!(provider = label, attempts = self.max_attempts, error = %e, "retry budget exhausted");
                        return Err(e);
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        provider = label,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "send attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}

fn uniform_jitter(base: Duration) -> Duration {
    let base_ms = base.as_millis() as u64;
    if base_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..base_ms))
}
