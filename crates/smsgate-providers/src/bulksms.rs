// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! BulkSMS JSON API client (primary gateway).

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use smsgate_config::model::BulkSmsConfig;
use smsgate_core::{AdapterType, HealthStatus, PluginAdapter, ProviderReceipt, SmsError, SmsProvider};
use tracing::debug;

use crate::{build_http_client, read_json, string_field};

pub const PROVIDER_NAME: &str = "bulksms";

#[derive(Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    body: &'a str,
}

/// Posts `{to, body}` as JSON with a preconfigured `Authorization` header.
#[derive(Debug, Clone)]
pub struct BulkSmsClient {
    client: reqwest::Client,
    base_url: String,
    has_credentials: bool,
}

impl BulkSmsClient {
    pub fn new(config: &BulkSmsConfig) -> Result<Self, SmsError> {
        let mut headers = HeaderMap::new();
        if let Some(auth) = &config.auth_header {
            let mut value = HeaderValue::from_str(auth).map_err(|e| {
                SmsError::Config(format!("invalid bulksms.auth_header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            client: build_http_client(headers)?,
            base_url: config.base_url.clone(),
            has_credentials: config.auth_header.is_some(),
        })
    }

    /// Extracts id and status from either a single message object or the
    /// array BulkSMS returns for batch submissions.
    fn parse_receipt(body: &serde_json::Value) -> ProviderReceipt {
        let message = match body {
            serde_json::Value::Array(items) => items.first(),
            other => Some(other),
        };
        let Some(message) = message else {
            return ProviderReceipt::default();
        };

        let status = string_field(message, "status").or_else(|| {
            message
                .get("status")
                .and_then(|s| string_field(s, "type"))
                .map(|t| t.to_ascii_lowercase())
        });

        ProviderReceipt {
            message_id: string_field(message, "id"),
            status,
        }
    }
}

#[async_trait]
impl PluginAdapter for BulkSmsClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SmsError> {
        if self.has_credentials {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(
                "bulksms.auth_header is not configured".to_string(),
            ))
        }
    }

    async fn shutdown(&self) -> Result<(), SmsError> {
        Ok(())
    }
}

#[async_trait]
impl SmsProvider for BulkSmsClient {
    async fn send(&self, to: &str, body: &str) -> Result<ProviderReceipt, SmsError> {
        let response = self
            .client
            .post(&self.base_url)
            .json(&SendRequest { to, body })
            .send()
            .await;
        let json = read_json(PROVIDER_NAME, response).await?;
        let receipt = Self::parse_receipt(&json);
        debug!(provider = PROVIDER_NAME, id = ?receipt.message_id, "message accepted");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> BulkSmsClient {
        BulkSmsClient::new(&BulkSmsConfig {
            base_url: format!("{base_url}/v1/messages"),
            auth_header: Some("Basic dGVzdDp0ZXN0".to_string()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn send_posts_json_with_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("authorization", "Basic dGVzdDp0ZXN0"))
            .and(body_json(json!({"to": "+27821234567", "body": "hello"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!([{"id": "bsms-1", "status": {"type": "ACCEPTED"}}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let receipt = test_client(&server.uri())
            .send("+27821234567", "hello")
            .await
            .unwrap();
        assert_eq!(receipt.message_id.as_deref(), Some("bsms-1"));
        assert_eq!(receipt.status.as_deref(), Some("accepted"));
    }

    #[tokio::test]
    async fn object_response_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 77, "status": "sent"})))
            .mount(&server)
            .await;

        let receipt = test_client(&server.uri()).send("+1", "x").await.unwrap();
        assert_eq!(receipt.message_id.as_deref(), Some("77"));
        assert_eq!(receipt.status.as_deref(), Some("sent"));
    }

    #[tokio::test]
    async fn non_2xx_is_provider_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).send("+1", "x").await.unwrap_err();
        match err {
            SmsError::Provider {
                provider, message, ..
            } => {
                assert_eq!(provider, "bulksms");
                assert!(message.contains("503"), "got {message}");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).send("+1", "x").await.unwrap_err();
        assert!(matches!(err, SmsError::Provider { source: Some(_), .. }));
    }

    #[tokio::test]
    async fn network_failure_is_provider_error() {
        let client = test_client("http://127.0.0.1:1");
        let err = client.send("+1", "x").await.unwrap_err();
        assert!(matches!(err, SmsError::Provider { .. }));
    }

    #[tokio::test]
    async fn missing_credentials_degrade_health() {
        let client = BulkSmsClient::new(&BulkSmsConfig::default()).unwrap();
        assert!(matches!(
            client.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
