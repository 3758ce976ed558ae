// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Africa's Talking messaging API client (secondary gateway).
//!
//! Requests are form-encoded; the response nests per-recipient results under
//! `SMSMessageData.Recipients`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use smsgate_config::model::AfricasTalkingConfig;
use smsgate_core::{AdapterType, HealthStatus, PluginAdapter, ProviderReceipt, SmsError, SmsProvider};
use tracing::debug;

use crate::{build_http_client, read_json, string_field};

pub const PROVIDER_NAME: &str = "africastalking";

#[derive(Debug, Clone)]
pub struct AfricasTalkingClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    has_credentials: bool,
}

impl AfricasTalkingClient {
    pub fn new(config: &AfricasTalkingConfig) -> Result<Self, SmsError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key).map_err(|e| {
                SmsError::Config(format!("invalid africastalking.api_key value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert("apiKey", value);
        }

        Ok(Self {
            client: build_http_client(headers)?,
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            has_credentials: config.api_key.is_some(),
        })
    }

    fn parse_receipt(body: &serde_json::Value) -> ProviderReceipt {
        let recipient = body
            .get("SMSMessageData")
            .and_then(|d| d.get("Recipients"))
            .and_then(|r| r.get(0));
        match recipient {
            Some(r) => ProviderReceipt {
                message_id: string_field(r, "messageId"),
                status: string_field(r, "status"),
            },
            None => ProviderReceipt::default(),
        }
    }
}

#[async_trait]
impl PluginAdapter for AfricasTalkingClient {
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
                "africastalking.api_key is not configured".to_string(),
            ))
        }
    }

    async fn shutdown(&self) -> Result<(), SmsError> {
        Ok(())
    }
}

#[async_trait]
impl SmsProvider for AfricasTalkingClient {
    async fn send(&self, to: &str, body: &str) -> Result<ProviderReceipt, SmsError> {
        let form = [
            ("username", self.username.as_str()),
            ("to", to),
            ("message", body),
        ];
        let response = self.client.post(&self.base_url).form(&form).send().await;
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
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> AfricasTalkingClient {
        AfricasTalkingClient::new(&AfricasTalkingConfig {
            base_url: format!("{base_url}/version1/messaging"),
            api_key: Some("at-test-key".to_string()),
            username: "sandbox".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn send_posts_form_and_reads_first_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/version1/messaging"))
            .and(header("apiKey", "at-test-key"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("username=sandbox"))
            .and(body_string_contains("to=%2B254712345678"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "SMSMessageData": {
                    "Message": "Sent to 1/1 Total Cost: KES 0.8000",
                    "Recipients": [{
                        "statusCode": 101,
                        "number": "+254712345678",
                        "status": "Success",
                        "cost": "KES 0.8000",
                        "messageId": "ATXid_1"
                    }]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = test_client(&server.uri())
            .send("+254712345678", "hello there")
            .await
            .unwrap();
        assert_eq!(receipt.message_id.as_deref(), Some("ATXid_1"));
        assert_eq!(receipt.status.as_deref(), Some("Success"));
    }

    #[tokio::test]
    async fn empty_recipients_yield_empty_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "SMSMessageData": {"Message": "InvalidPhoneNumber", "Recipients": []}
            })))
            .mount(&server)
            .await;

        let receipt = test_client(&server.uri()).send("+1", "x").await.unwrap();
        assert_eq!(receipt, ProviderReceipt::default());
    }

    #[tokio::test]
    async fn unauthorized_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("The supplied authentication is invalid"))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).send("+1", "x").await.unwrap_err();
        assert!(matches!(err, SmsError::Provider { ref provider, .. } if provider == "africastalking"));
    }
}
