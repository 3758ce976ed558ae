// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unauthenticated machine-to-machine routes: provider webhooks and the cron
//! trigger for the campaign dispatch loop.

use std::collections::HashMap;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
};
use serde_json::{Value, json};
use smsgate_core::SmsError;
use smsgate_dispatch::InboundEvent;

use crate::error::{ApiError, ApiSuccess, ok};
use crate::server::GatewayState;

type ApiResult = Result<Json<ApiSuccess<Value>>, ApiError>;

/// POST /v1/webhooks/bulksms
pub async fn bulksms(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    receive(&state, "bulksms", &headers, &body).await
}

/// POST /v1/webhooks/africastalking
pub async fn africastalking(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult {
    receive(&state, "africastalking", &headers, &body).await
}

async fn receive(state: &GatewayState, provider: &str, headers: &HeaderMap, body: &[u8]) -> ApiResult {
    let receipts = &state.services.receipts;
    match parse_payload(headers, body)? {
        WebhookPayload::Single(event) => {
            let outcome = receipts.process(provider, &event).await?;
            Ok(ok(serde_json::to_value(outcome).map_err(|e| SmsError::Internal(e.to_string()))?))
        }
        WebhookPayload::Batch(events) => {
            tracing::debug!(provider, events = events.len(), "webhook batch received");
            let mut updated = 0;
            for event in &events {
                updated += receipts.process(provider, event).await?.updated;
            }
            Ok(ok(json!({
                "received": true,
                "events": events.len(),
                "updated": updated,
            })))
        }
    }
}

/// A webhook body: one event, or a JSON array of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookPayload {
    Single(InboundEvent),
    Batch(Vec<InboundEvent>),
}

/// Decodes a webhook body as JSON (object or array of objects) or as a
/// url-encoded form, chosen by `Content-Type` with a best guess when absent.
pub fn parse_payload(headers: &HeaderMap, body: &[u8]) -> Result<WebhookPayload, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.contains("application/json") {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| SmsError::validation(format!("invalid JSON body: {e}")))?;
        return Ok(payload_from_json(&value));
    }
    if content_type.contains("application/x-www-form-urlencoded") {
        return Ok(WebhookPayload::Single(event_from_form(body)?));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(WebhookPayload::Single(InboundEvent::default()));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => Ok(payload_from_json(&value)),
        Err(_) => Ok(WebhookPayload::Single(event_from_form(body)?)),
    }
}

fn payload_from_json(value: &Value) -> WebhookPayload {
    match value {
        Value::Array(items) => WebhookPayload::Batch(items.iter().map(InboundEvent::from_json).collect()),
        other => WebhookPayload::Single(InboundEvent::from_json(other)),
    }
}

fn event_from_form(body: &[u8]) -> Result<InboundEvent, ApiError> {
    let fields: HashMap<String, String> = serde_urlencoded::from_bytes(body)
        .map_err(|e| SmsError::validation(format!("invalid form body: {e}")))?;
    Ok(InboundEvent::from_fields(&fields))
}

/// GET /api/cron/dispatch
///
/// Runs one iteration of the campaign dispatch loop.
pub async fn cron_dispatch(State(state): State<GatewayState>, headers: HeaderMap) -> ApiResult {
    if !state.auth.cron_allowed(&headers) {
        return Err(SmsError::Unauthorized.into());
    }
    let summary = state.services.runner.run_once().await?;
    tracing::info!(processed = summary.processed, "cron dispatch finished");
    Ok(ok(serde_json::to_value(summary).map_err(|e| SmsError::Internal(e.to_string()))?))
}
