// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort duplicate request suppression keyed by client-supplied tokens.

use std::sync::Arc;

use smsgate_core::{Clock, SmsError, StorageAdapter};
use tracing::{debug, warn};

/// Remembers `(key, client)` pairs for a rolling window.
///
/// Lookup precedes insert without a lock, so concurrent requests bearing the
/// same key may both be processed.
pub struct IdempotencyGuard {
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    window: chrono::Duration,
}

impl IdempotencyGuard {
    pub fn new(storage: Arc<dyn StorageAdapter>, clock: Arc<dyn Clock>, window_hours: u64) -> Self {
        Self {
            storage,
            clock,
            window: chrono::Duration::hours(window_hours as i64),
        }
    }

    /// `false` when the pair was recorded within the window.
    pub async fn should_process(&self, key: &str, client_id: &str) -> Result<bool, SmsError> {
        let since = self.clock.now() - self.window;
        let seen = self.storage.idempotency_seen(key, client_id, since).await?;
        if seen {
            debug!(client_id, key, "duplicate request short-circuited");
        }
        Ok(!seen)
    }

    /// Records the pair. Failures are logged and otherwise ignored.
    pub async fn record(&self, key: &str, client_id: &str) {
        if let Err(e) = self
            .storage
            .record_idempotency(key, client_id, self.clock.now())
            .await
        {
            warn!(client_id, key, error = %e, "failed to record idempotency key");
        }
    }
}
