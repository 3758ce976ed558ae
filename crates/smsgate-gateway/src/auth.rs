// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller resolution middleware.
//!
//! Credentials are checked in order:
//! 1. `X-Api-Key`, hashed and matched against stored keys (tenant context)
//! 2. `Authorization: Bearer <token>` matched against `server.admin_token`
//!    (admin context)
//!
//! A request that presents neither, or presents an unknown key, is rejected
//! with 401. The resolved [`ClientContext`] is placed in request extensions.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use smsgate_core::{ClientContext, SmsError};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Client id carried by the admin context.
pub const ADMIN_CLIENT_ID: &str = "admin";

/// Static credentials for the gateway.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Bearer token granting the admin context. `None` disables bearer auth.
    pub admin_token: Option<String>,
    /// Expected `X-Cron-Secret`. `None` leaves the cron trigger open.
    pub cron_secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[redacted]"))
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl AuthConfig {
    /// Whether `headers` satisfy the cron secret, if one is configured.
    pub fn cron_allowed(&self, headers: &HeaderMap) -> bool {
        match &self.cron_secret {
            None => true,
            Some(expected) => header_str(headers, "x-cron-secret") == Some(expected.as_str()),
        }
    }
}

pub async fn resolve_caller(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = caller_context(&state, request.headers()).await?;
    tracing::debug!(client_id = %ctx.client_id, is_admin = ctx.is_admin, "caller resolved");
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

async fn caller_context(state: &GatewayState, headers: &HeaderMap) -> Result<ClientContext, SmsError> {
    if let Some(key) = header_str(headers, "x-api-key") {
        return state
            .services
            .api_keys
            .resolve(key)
            .await?
            .ok_or(SmsError::Unauthorized);
    }

    if let Some(expected) = state.auth.admin_token.as_deref() {
        let bearer = header_str(headers, "authorization").and_then(|v| v.strip_prefix("Bearer "));
        if bearer == Some(expected) {
            return Ok(ClientContext {
                client_id: ADMIN_CLIENT_ID.to_string(),
                is_admin: true,
            });
        }
    }

    Err(SmsError::Unauthorized)
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn debug_redacts_secrets() {
        let config = AuthConfig {
            admin_token: Some("root-token".into()),
            cron_secret: Some("cron-token".into()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("root-token"));
        assert!(!debug.contains("cron-token"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn cron_secret_check() {
        let open = AuthConfig::default();
        assert!(open.cron_allowed(&HeaderMap::new()));

        let locked = AuthConfig {
            cron_secret: Some("s3cret".into()),
            ..AuthConfig::default()
        };
        let mut headers = HeaderMap::new();
        assert!(!locked.cron_allowed(&headers));
        headers.insert("x-cron-secret", HeaderValue::from_static("wrong"));
        assert!(!locked.cron_allowed(&headers));
        headers.insert("x-cron-secret", HeaderValue::from_static("s3cret"));
        assert!(locked.cron_allowed(&headers));
    }
}
