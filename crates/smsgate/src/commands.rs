// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot subcommands: `dispatch`, `client add`, `api-key create`.

use smsgate_config::SmsgateConfig;
use smsgate_core::{Client, Clock, SmsError, StorageAdapter};

use crate::app::App;

/// Runs one campaign dispatch iteration and prints the JSON summary.
pub async fn run_dispatch(config: &SmsgateConfig) -> Result<(), SmsError> {
    let app = App::open(config).await?;
    let summary = app.services.runner.run_once().await;
    app.close().await?;

    let summary = summary?;
    println!("{}", to_pretty(&summary)?);
    Ok(())
}

/// Arguments for `smsgate client add`.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub id: String,
    pub name: String,
    pub plan: String,
    pub allowance: i64,
}

pub async fn run_client_add(config: &SmsgateConfig, new: NewClient) -> Result<(), SmsError> {
    if new.allowance < 0 {
        return Err(SmsError::validation("allowance must not be negative"));
    }
    if !config.rate_limit.plans.contains_key(&new.plan) {
        tracing::warn!(plan = %new.plan, "plan has no rate limit entry, the default plan cap applies");
    }

    let app = App::open(config).await?;
    let client = Client {
        id: new.id,
        name: new.name,
        plan: new.plan,
        used: 0,
        allowance: new.allowance,
        is_admin: false,
        created_at: app.clock.timestamp(),
    };
    let created = app.storage.create_client(&client).await;
    app.close().await?;
    created?;

    println!("{}", to_pretty(&client)?);
    Ok(())
}

/// Prints the raw key once; only its hash is stored.
pub async fn run_api_key_create(
    config: &SmsgateConfig,
    client_id: &str,
    name: Option<String>,
) -> Result<(), SmsError> {
    let app = App::open(config).await?;
    let created = app.services.api_keys.create(client_id, name).await;
    app.close().await?;
    let created = created?;

    println!("{}", to_pretty(&created)?);
    eprintln!("store this key now; it cannot be shown again");
    Ok(())
}

fn to_pretty<T: serde::Serialize>(value: &T) -> Result<String, SmsError> {
    serde_json::to_string_pretty(value).map_err(|e| SmsError::Internal(e.to_string()))
}
