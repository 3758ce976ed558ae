// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opt-out handling: filtering recipients and recording inbound STOP replies.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use smsgate_core::{Clock, PhoneNormalizer, SmsError, StorageAdapter, SuppressionEntry, is_e164};
use tracing::{debug, info, warn};

static OPT_OUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:stop|unsubscribe)\b").unwrap());

/// Whether an inbound message body asks to opt out.
pub fn is_opt_out(text: &str) -> bool {
    OPT_OUT.is_match(text)
}

/// Recipients split by suppression membership, each in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuppressionOutcome {
    pub allowed: Vec<String>,
    pub suppressed: Vec<String>,
}

/// Splits `phones` against a known suppression set.
pub fn partition_suppressed(phones: &[String], suppressed: &HashSet<String>) -> SuppressionOutcome {
    let (blocked, allowed) = phones
        .iter()
        .cloned()
        .partition(|phone| suppressed.contains(phone));
    SuppressionOutcome {
        allowed,
        suppressed: blocked,
    }
}

pub struct SuppressionFilter {
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    normalizer: PhoneNormalizer,
}

impl SuppressionFilter {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        clock: Arc<dyn Clock>,
        normalizer: PhoneNormalizer,
    ) -> Self {
        Self {
            storage,
            clock,
            normalizer,
        }
    }

    /// Removes the client's opted-out numbers from `phones`.
    pub async fn filter(
        &self,
        client_id: &str,
        phones: &[String],
    ) -> Result<SuppressionOutcome, SmsError> {
        if phones.is_empty() {
            return Ok(SuppressionOutcome::default());
        }
        let suppressed = self.storage.suppressed_phones(client_id, phones).await?;
        let outcome = partition_suppressed(phones, &suppressed);
        if !outcome.suppressed.is_empty() {
            debug!(client_id, count = outcome.suppressed.len(), "suppressed recipients removed");
        }
        Ok(outcome)
    }

    /// Handles an inbound reply. When `text` is an opt-out from a number some
    /// client has messaged, that number is suppressed for the client that
    /// messaged it most recently, whose id is returned.
    pub async fn handle_inbound(&self, from: &str, text: &str) -> Result<Option<String>, SmsError> {
        if !is_opt_out(text) {
            return Ok(None);
        }

        let phone = self.normalizer.normalize(from);
        if !is_e164(&phone) {
            debug!(from, "opt-out from unrecognizable number ignored");
            return Ok(None);
        }

        let Some(client_id) = self.storage.latest_client_for_number(&phone).await? else {
            debug!(phone = %phone, "opt-out from number with no sending history");
            return Ok(None);
        };

        let entry = SuppressionEntry {
            client_id: client_id.clone(),
            phone: phone.clone(),
            reason: "stop".to_string(),
            created_at: self.clock.timestamp(),
        };
        match self.storage.add_suppression(&entry).await {
            Ok(true) => info!(client_id = %client_id, phone = %phone, "recipient opted out"),
            Ok(false) => debug!(client_id = %client_id, phone = %phone, "recipient already suppressed"),
            Err(e) => warn!(client_id = %client_id, phone = %phone, error = %e, "failed to record opt-out"),
        }
        Ok(Some(client_id))
    }
}
