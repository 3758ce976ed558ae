// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by every subcommand: storage, providers and services.

use std::sync::Arc;

use smsgate_config::SmsgateConfig;
use smsgate_core::{Clock, SmsError, StorageAdapter, SystemClock};
use smsgate_dispatch::{FallbackDispatcher, Services};
use smsgate_providers::{AfricasTalkingClient, BulkSmsClient};
use smsgate_storage::SqliteStorage;
use tracing::info;

pub struct App {
    pub storage: Arc<dyn StorageAdapter>,
    pub services: Services,
    pub clock: Arc<dyn Clock>,
}

impl App {
    /// Opens (and migrates) the database and builds the provider chain:
    /// BulkSMS first, Africa's Talking as fallback.
    pub async fn open(config: &SmsgateConfig) -> Result<Self, SmsError> {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let primary = Arc::new(BulkSmsClient::new(&config.bulksms)?);
        let secondary = Arc::new(AfricasTalkingClient::new(&config.africastalking)?);
        let dispatcher = Arc::new(FallbackDispatcher::primary_secondary(
            primary,
            secondary,
            &config.dispatch,
            clock.clone(),
        ));
        info!(providers = ?dispatcher.provider_names(), "dispatcher ready");

        let services = Services::new(storage.clone(), dispatcher, clock.clone(), config);
        Ok(Self {
            storage,
            services,
            clock,
        })
    }

    pub async fn close(&self) -> Result<(), SmsError> {
        self.storage.shutdown().await
    }
}
