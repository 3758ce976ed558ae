// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound SMS gateway clients.
//!
//! Each client implements [`SmsProvider`](smsgate_core::SmsProvider) with a
//! single HTTP request per send. Retries and failover belong to the
//! dispatcher, not to these clients.

pub mod africastalking;
pub mod bulksms;

use std::time::Duration;

use smsgate_core::SmsError;

pub use africastalking::AfricasTalkingClient;
pub use bulksms::BulkSmsClient;

/// Per-request timeout for gateway calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads a response body as JSON, turning non-2xx statuses, transport
/// failures and unparseable bodies into [`SmsError::Provider`].
pub(crate) async fn read_json(
    provider: &str,
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<serde_json::Value, SmsError> {
    let response = response.map_err(|e| SmsError::Provider {
        provider: provider.to_string(),
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SmsError::provider(
            provider,
            format!("gateway returned {status}: {body}"),
        ));
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| SmsError::Provider {
            provider: provider.to_string(),
            message: format!("malformed response body: {e}"),
            source: Some(Box::new(e)),
        })
}

/// String value of `field`, accepting numbers as well.
pub(crate) fn string_field(value: &serde_json::Value, field: &str) -> Option<String> {
    match value.get(field)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn build_http_client(
    headers: reqwest::header::HeaderMap,
) -> Result<reqwest::Client, SmsError> {
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| SmsError::Config(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_field_accepts_numbers() {
        let v = json!({"id": 42, "status": "ok", "empty": ""});
        assert_eq!(string_field(&v, "id").as_deref(), Some("42"));
        assert_eq!(string_field(&v, "status").as_deref(), Some("ok"));
        assert_eq!(string_field(&v, "empty"), None);
        assert_eq!(string_field(&v, "missing"), None);
    }
}
