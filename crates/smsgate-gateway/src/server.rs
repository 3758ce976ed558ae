// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use smsgate_config::model::ServerConfig;
use smsgate_core::{Clock, SmsError, StorageAdapter};
use smsgate_dispatch::Services;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, resolve_caller};
use crate::{handlers, webhooks};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub services: Services,
    /// Used directly only by the readiness probe.
    pub storage: Arc<dyn StorageAdapter>,
    pub clock: Arc<dyn Clock>,
    pub auth: AuthConfig,
}

impl GatewayState {
    pub fn new(
        services: Services,
        storage: Arc<dyn StorageAdapter>,
        clock: Arc<dyn Clock>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            services,
            storage,
            clock,
            auth: AuthConfig {
                admin_token: config.admin_token.clone(),
                cron_secret: config.cron_secret.clone(),
            },
        }
    }
}

/// Builds the full route table.
///
/// Public: `/health`, `/ready`, `/api/cron/dispatch` (optional cron secret),
/// and the provider webhooks. Everything else goes through
/// [`resolve_caller`].
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/api/cron/dispatch", get(webhooks::cron_dispatch))
        .route("/v1/webhooks/bulksms", post(webhooks::bulksms))
        .route("/v1/webhooks/africastalking", post(webhooks::africastalking))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/sms", post(handlers::send_sms))
        .route("/v1/sms/batch", post(handlers::send_batch))
        .route(
            "/v1/campaigns",
            get(handlers::list_campaigns).post(handlers::create_campaign),
        )
        .route("/v1/campaigns/schedule", post(handlers::schedule_campaign))
        .route(
            "/v1/campaigns/{id}",
            get(handlers::get_campaign).post(handlers::campaign_action),
        )
        .route(
            "/v1/contacts",
            get(handlers::list_contacts)
                .post(handlers::create_contacts)
                .delete(handlers::delete_contacts),
        )
        .route("/v1/contacts/upload", post(handlers::upload_contacts))
        .route(
            "/v1/contacts/{id}",
            patch(handlers::update_contact).delete(handlers::delete_contact),
        )
        .route(
            "/v1/tags",
            get(handlers::list_tags).post(handlers::create_tag),
        )
        .route(
            "/v1/templates",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route(
            "/v1/api-keys",
            get(handlers::list_api_keys)
                .post(handlers::create_api_key)
                .delete(handlers::revoke_api_key),
        )
        .route("/admin/clients", patch(handlers::update_client_allowance))
        .route("/admin/audit-logs", get(handlers::list_audit_logs))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            resolve_caller,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `host:port` and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), SmsError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SmsError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| SmsError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
