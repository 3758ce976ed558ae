// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `smsgate serve` command.

use std::sync::Arc;
use std::time::Duration;

use smsgate_config::SmsgateConfig;
use smsgate_core::SmsError;
use smsgate_dispatch::DispatchLoop;
use smsgate_gateway::{GatewayState, start_server};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::App;
use crate::shutdown;

/// Serves the HTTP API until SIGINT/SIGTERM, optionally ticking the campaign
/// dispatch loop in-process.
pub async fn run_serve(config: SmsgateConfig) -> Result<(), SmsError> {
    info!(name = %config.app.name, "starting smsgate serve");

    let app = App::open(&config).await?;
    let cancel = shutdown::install_signal_handler();

    let ticker = (config.dispatch.interval_secs > 0).then(|| {
        tokio::spawn(run_ticker(
            app.services.runner.clone(),
            Duration::from_secs(config.dispatch.interval_secs),
            cancel.clone(),
        ))
    });

    let state = GatewayState::new(
        app.services.clone(),
        app.storage.clone(),
        app.clock.clone(),
        &config.server,
    );
    let served = start_server(&config.server, state, cancel.clone()).await;

    // A bind failure returns before any signal arrives; stop the ticker too.
    cancel.cancel();
    if let Some(handle) = ticker {
        if let Err(e) = handle.await {
            warn!(error = %e, "dispatch ticker task panicked");
        }
    }

    app.close().await?;
    info!("smsgate stopped");
    served
}

/// Runs one dispatch iteration per `every` until `cancel` fires.
pub async fn run_ticker(runner: Arc<DispatchLoop>, every: Duration, cancel: CancellationToken) {
    info!(interval_secs = every.as_secs(), "dispatch ticker started");
    let mut interval = tokio::time::interval(every);
    // Skip the first immediate tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match runner.run_once().await {
                    Ok(summary) if summary.processed > 0 => {
                        info!(processed = summary.processed, "dispatch tick processed campaigns");
                    }
                    Ok(_) => debug!("dispatch tick found no due campaigns"),
                    Err(e) => warn!(error = %e, "dispatch tick failed (non-fatal)"),
                }
            }
            _ = cancel.cancelled() => {
                info!("dispatch ticker shutting down");
                break;
            }
        }
    }
}
