// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound dispatch pipeline for smsgate.
//!
//! Everything between an authenticated request and a provider call lives here:
//! - [`FallbackDispatcher`] retries the primary provider with exponential
//!   backoff, then fails over to the secondary
//! - [`RateLimiter`], [`IdempotencyGuard`] and [`SuppressionFilter`] gate
//!   each send
//! - [`CampaignService`] and [`DispatchLoop`] queue and drain campaigns
//! - [`ReceiptProcessor`] folds delivery receipts and opt-outs back in
//!
//! [`Services`] wires them all to one storage handle and one clock.

pub mod accounting;
pub mod admin;
pub mod api_keys;
pub mod batch;
pub mod campaign;
pub mod contact_import;
pub mod contacts;
pub mod fallback;
pub mod idempotency;
pub mod rate_limit;
pub mod receipts;
pub mod recipients;
pub mod retry;
pub mod runner;
pub mod send;
pub mod suppression;
pub mod templates;
mod validate;

use std::sync::Arc;

use smsgate_config::SmsgateConfig;
use smsgate_core::{Clock, PhoneNormalizer, StorageAdapter};

pub use accounting::Ledger;
pub use admin::{AdminService, AllowanceUpdate, AuditPage, AuditQuery};
pub use api_keys::{ApiKeyService, CreatedApiKey, hash_api_key};
pub use batch::{BatchPreview, BatchRequest};
pub use campaign::{CampaignService, CreateCampaignRequest, ScheduleRequest};
pub use contact_import::{ContactImportOutcome, ContactImportRequest};
pub use contacts::{ContactService, ContactUpdate};
pub use fallback::{DispatchResult, FallbackDispatcher, ProviderStrategy};
pub use idempotency::IdempotencyGuard;
pub use rate_limit::{RateDecision, RateLimiter};
pub use receipts::{InboundEvent, ReceiptProcessor, WebhookOutcome, map_delivery_status};
pub use recipients::InvalidRecipient;
pub use retry::RetryPolicy;
pub use runner::{DispatchLoop, DispatchSummary};
pub use send::{BatchOutcome, SendOutcome, SendRequest, SendService};
pub use suppression::{SuppressionFilter, is_opt_out};
pub use templates::{NewTemplate, TemplateService};

/// Every service the HTTP surface and the CLI call into, sharing one storage
/// handle, one dispatcher and one clock.
#[derive(Clone)]
pub struct Services {
    pub send: Arc<SendService>,
    pub campaigns: Arc<CampaignService>,
    pub runner: Arc<DispatchLoop>,
    pub contacts: Arc<ContactService>,
    pub templates: Arc<TemplateService>,
    pub api_keys: Arc<ApiKeyService>,
    pub admin: Arc<AdminService>,
    pub receipts: Arc<ReceiptProcessor>,
}

impl Services {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        dispatcher: Arc<FallbackDispatcher>,
        clock: Arc<dyn Clock>,
        config: &SmsgateConfig,
    ) -> Self {
        let normalizer = PhoneNormalizer::new(config.phone.default_country_code.as_str());

        let ledger = Arc::new(Ledger::new(
            storage.clone(),
            clock.clone(),
            config.dispatch.message_cost,
        ));
        let suppression = Arc::new(SuppressionFilter::new(
            storage.clone(),
            clock.clone(),
            normalizer.clone(),
        ));
        let limiter = Arc::new(RateLimiter::new(
            storage.clone(),
            clock.clone(),
            config.rate_limit.clone(),
        ));
        let guard = Arc::new(IdempotencyGuard::new(
            storage.clone(),
            clock.clone(),
            config.idempotency.window_hours,
        ));
        let runner = Arc::new(DispatchLoop::new(
            storage.clone(),
            dispatcher.clone(),
            ledger.clone(),
            clock.clone(),
            config.dispatch.batch_size,
        ));

        Self {
            send: Arc::new(SendService::new(
                storage.clone(),
                dispatcher,
                limiter,
                guard,
                suppression.clone(),
                ledger,
                normalizer.clone(),
            )),
            campaigns: Arc::new(CampaignService::new(
                storage.clone(),
                suppression.clone(),
                runner.clone(),
                clock.clone(),
                normalizer.clone(),
            )),
            runner,
            contacts: Arc::new(ContactService::new(storage.clone(), normalizer)),
            templates: Arc::new(TemplateService::new(storage.clone(), clock.clone())),
            api_keys: Arc::new(ApiKeyService::new(storage.clone(), clock.clone())),
            admin: Arc::new(AdminService::new(storage.clone(), clock.clone())),
            receipts: Arc::new(ReceiptProcessor::new(storage, suppression, clock)),
        }
    }
}
