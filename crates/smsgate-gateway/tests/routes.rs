// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router-level tests: every request goes through the real middleware stack
//! against a temp SQLite database and scripted providers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use smsgate_config::SmsgateConfig;
use smsgate_config::model::ServerConfig;
use smsgate_core::Clock;
use smsgate_dispatch::{FallbackDispatcher, Services};
use smsgate_gateway::{GatewayState, build_router};
use smsgate_test_utils::{ManualClock, MockSmsProvider, TestDb};
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "admin-token";
const CRON_SECRET: &str = "cron-secret";

struct Harness {
    db: TestDb,
    router: Router,
    services: Services,
    primary: Arc<MockSmsProvider>,
}

async fn harness_with(config: SmsgateConfig) -> Harness {
    let db = TestDb::new().await.unwrap();
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
    let primary = Arc::new(MockSmsProvider::new("primary"));
    let dispatcher = Arc::new(FallbackDispatcher::primary_secondary(
        primary.clone(),
        Arc::new(MockSmsProvider::always_failing("secondary")),
        &config.dispatch,
        clock.clone(),
    ));
    let services = Services::new(db.storage(), dispatcher, clock.clone(), &config);
    let server = ServerConfig {
        admin_token: Some(ADMIN_TOKEN.into()),
        cron_secret: Some(CRON_SECRET.into()),
        ..ServerConfig::default()
    };
    let state = GatewayState::new(services.clone(), db.storage(), clock, &server);
    Harness {
        router: build_router(state),
        db,
        services,
        primary,
    }
}

async fn harness() -> Harness {
    harness_with(SmsgateConfig::default()).await
}

impl Harness {
    /// Seeds a client and returns a raw API key for it.
    async fn tenant(&self, id: &str, allowance: i64) -> String {
        self.db.seed_client(id, "starter", allowance).await.unwrap();
        self.services.api_keys.create(id, None).await.unwrap().key
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value, axum::http::HeaderMap) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body, headers)
    }
}

fn json_request(method: &str, uri: &str, key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn probes_are_public() {
    let h = harness().await;

    let (status, body, _) = h.call(get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "live");

    let (status, body, _) = h.call(get("/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ready");
}

#[tokio::test]
async fn missing_or_unknown_credentials_are_401() {
    let h = harness().await;

    let (status, body, _) = h.call(get("/v1/contacts", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _, _) = h.call(get("/v1/contacts", Some("sk_nope"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn direct_send_with_idempotency_key() {
    let h = harness().await;
    let key = h.tenant("acme", 100).await;

    let request = || {
        let mut req = json_request(
            "POST",
            "/v1/sms",
            Some(key.as_str()),
            json!({ "to": "0821234567", "message": "hello" }),
        );
        req.headers_mut()
            .insert("idempotency-key", "order-42".parse().unwrap());
        req
    };

    let (status, body, _) = h.call(request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["idempotent"], true);
    assert_eq!(body["data"]["sent"], 1);

    let (status, body, _) = h.call(request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["idempotent"], true);
    assert_eq!(body["data"]["alreadyProcessed"], true);

    assert_eq!(h.primary.calls(), 1);
}

#[tokio::test]
async fn send_validation_and_quota() {
    let h = harness().await;
    let key = h.tenant("acme", 1).await;

    let (status, body, _) = h
        .call(json_request(
            "POST",
            "/v1/sms",
            Some(key.as_str()),
            json!({ "to": "0821234567", "message": "x".repeat(161) }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body, _) = h
        .call(json_request(
            "POST",
            "/v1/sms",
            Some(key.as_str()),
            json!({ "recipients": ["0821111111", "0822222222"], "message": "hi" }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "quota_exceeded");
    assert_eq!(h.primary.calls(), 0);
}

#[tokio::test]
async fn rate_limit_returns_retry_after() {
    let mut config = SmsgateConfig::default();
    config.rate_limit.plans = BTreeMap::from([("starter".to_string(), 1)]);
    let h = harness_with(config).await;
    let key = h.tenant("acme", 100).await;

    let send = || {
        json_request(
            "POST",
            "/v1/sms",
            Some(key.as_str()),
            json!({ "to": "0821234567", "message": "hi" }),
        )
    };
    let (status, _, _) = h.call(send()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, headers) = h.call(send()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "60");
    assert_eq!(body["error"]["details"]["retryAfterSeconds"], 60);
}

#[tokio::test]
async fn campaign_lifecycle_through_cron() {
    let h = harness().await;
    let key = h.tenant("acme", 100).await;
    h.db.seed_contacts(
        "acme",
        &[
            ("+27821111111", Some("Ann"), Some("vip")),
            ("+27822222222", Some("Bob"), Some("vip")),
            ("+27823333333", Some("Cid"), None),
        ],
    )
    .await
    .unwrap();

    let (status, body, _) = h
        .call(json_request(
            "POST",
            "/v1/campaigns",
            Some(key.as_str()),
            json!({ "name": "Launch", "message": "Hi {name}", "tag": "vip" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["queued"], 2);
    let id = body["data"]["campaign"]["id"].as_str().unwrap().to_string();

    let (status, _, _) = h.call(get("/api/cron/dispatch", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let cron = Request::builder()
        .uri("/api/cron/dispatch")
        .header("x-cron-secret", CRON_SECRET)
        .body(Body::empty())
        .unwrap();
    let (status, body, _) = h.call(cron).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["processed"], 1);
    assert_eq!(body["data"]["results"][0]["status"], "sent");

    let (status, body, _) = h.call(get(&format!("/v1/campaigns/{id}"), Some(key.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "sent");
    assert_eq!(body["data"]["stats"]["sent"], 2);

    let bodies: Vec<String> = h.primary.sent().await.into_iter().map(|(_, b)| b).collect();
    assert!(bodies.contains(&"Hi Ann".to_string()));

    let (status, body, _) = h
        .call(json_request(
            "POST",
            &format!("/v1/campaigns/{id}"),
            Some(key.as_str()),
            json!({ "action": "explode" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _, _) = h.call(get("/v1/campaigns/missing", Some(key.as_str()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhooks_apply_receipts_and_opt_outs() {
    let h = harness().await;
    let key = h.tenant("acme", 100).await;

    let (status, _, _) = h
        .call(json_request(
            "POST",
            "/v1/sms",
            Some(key.as_str()),
            json!({ "to": "0821234567", "message": "promo" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = h
        .call(json_request(
            "POST",
            "/v1/webhooks/bulksms",
            None,
            json!({ "id": "primary-1", "status": "DELIVERED" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["received"], true);
    assert_eq!(body["data"]["status"], "delivered");
    assert_eq!(body["data"]["updated"], 1);

    let stop = Request::builder()
        .method("POST")
        .uri("/v1/webhooks/africastalking")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("from=%2B27821234567&text=Stop"))
        .unwrap();
    let (status, body, _) = h.call(stop).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["suppressedFor"], "acme");

    let (_, body, _) = h
        .call(json_request(
            "POST",
            "/v1/sms",
            Some(key.as_str()),
            json!({ "to": "0821234567", "message": "promo again" }),
        ))
        .await;
    assert_eq!(body["data"]["sent"], 0);
    assert_eq!(body["data"]["suppressed"][0], "+27821234567");
    assert_eq!(h.primary.calls(), 1);
}

#[tokio::test]
async fn contacts_crud() {
    let h = harness().await;
    let key = h.tenant("acme", 100).await;

    let (status, body, _) = h
        .call(json_request(
            "POST",
            "/v1/contacts",
            Some(key.as_str()),
            json!({ "contacts": [{ "phone": "0821111111", "tag": "vip" }, { "phone": "bad" }] }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], 1);
    assert_eq!(body["data"]["invalid"][0]["row"], 2);
    let id = body["data"]["contacts"][0]["id"].as_str().unwrap().to_string();

    let (_, body, _) = h.call(get("/v1/contacts?tag=vip", Some(key.as_str()))).await;
    assert_eq!(body["meta"]["count"], 1);

    let (status, body, _) = h
        .call(json_request(
            "PATCH",
            &format!("/v1/contacts/{id}"),
            Some(key.as_str()),
            json!({ "name": "Ann" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ann");

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/contacts/{id}"))
        .header("x-api-key", &key)
        .body(Body::empty())
        .unwrap();
    let (status, body, _) = h.call(delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);
}

#[tokio::test]
async fn contact_upload_and_bulk_delete() {
    let h = harness().await;
    let key = h.tenant("acme", 100).await;
    let csv = "Mobile,Name,Group\n0821111111,Ann,vip\n0822222222,Bob,\n,Nobody,\n";
    let upload = |commit: bool| {
        json_request(
            "POST",
            "/v1/contacts/upload",
            Some(key.as_str()),
            json!({ "csv": csv, "commit": commit, "phoneColumn": "mobile", "tagColumn": "group" }),
        )
    };

    let (status, body, _) = h.call(upload(false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["preview"], true);
    assert_eq!(body["data"]["parsed"], 2);
    assert_eq!(body["data"]["invalid"][0]["reason"], "empty phone");
    assert_eq!(body["data"]["sample"][0]["phone"], "+27821111111");

    let (status, body, _) = h.call(upload(true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], 2);

    let (_, body, _) = h.call(get("/v1/tags", Some(key.as_str()))).await;
    assert_eq!(body["data"][0]["name"], "vip");

    let (status, body, _) = h
        .call(json_request(
            "POST",
            "/v1/contacts/upload",
            Some(key.as_str()),
            json!({ "csv": "name,number\nAnn,0821111111\n" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    let (_, body, _) = h.call(get("/v1/contacts", Some(key.as_str()))).await;
    let ids: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect();
    let (status, body, _) = h
        .call(json_request("DELETE", "/v1/contacts", Some(key.as_str()), json!({ "ids": ids })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], 2);

    let (_, body, _) = h.call(get("/v1/contacts", Some(key.as_str()))).await;
    assert_eq!(body["meta"]["count"], 0);
}

#[tokio::test]
async fn tags_templates_and_campaign_list() {
    let h = harness().await;
    let key = h.tenant("acme", 100).await;

    let (status, body, _) = h
        .call(json_request("POST", "/v1/tags", Some(key.as_str()), json!({ "name": "vip" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "vip");
    let (status, _, _) = h
        .call(json_request("POST", "/v1/tags", Some(key.as_str()), json!({})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body, _) = h
        .call(json_request(
            "POST",
            "/v1/templates",
            Some(key.as_str()),
            json!({ "name": "Promo", "text": "Hi {name}, use {code} before {date}" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["variables"], json!(["name", "code", "date"]));
    let (status, _, _) = h
        .call(json_request("POST", "/v1/templates", Some(key.as_str()), json!({ "name": "x" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body, _) = h.call(get("/v1/templates", Some(key.as_str()))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "Promo");

    let (_, body, _) = h.call(get("/v1/campaigns", Some(key.as_str()))).await;
    assert_eq!(body["meta"]["count"], 0);
    let (status, _, _) = h
        .call(json_request(
            "POST",
            "/v1/campaigns",
            Some(key.as_str()),
            json!({ "name": "Launch", "message": "Hi", "recipients": ["0821111111"] }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body, _) = h.call(get("/v1/campaigns", Some(key.as_str()))).await;
    assert_eq!(body["meta"]["count"], 1);
    assert_eq!(body["data"][0]["name"], "Launch");
}

#[tokio::test]
async fn audit_logs_are_admin_only() {
    let h = harness().await;
    let key = h.tenant("acme", 10).await;
    let admin_request = |method: &str, uri: &str, body: Value| {
        let mut request = json_request(method, uri, None, body);
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {ADMIN_TOKEN}").parse().unwrap(),
        );
        request
    };

    for allowance in [20, 30] {
        let (status, _, _) = h
            .call(admin_request(
                "PATCH",
                "/admin/clients",
                json!({ "clientId": "acme", "allowance": allowance }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body, _) = h.call(get("/admin/audit-logs", Some(key.as_str()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, body, _) = h
        .call(admin_request("GET", "/admin/audit-logs?limit=1&adminId=admin", json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["limit"], 1);
    assert_eq!(body["data"]["offset"], 0);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["items"][0]["target"], "acme");
}

#[tokio::test]
async fn admin_allowance_requires_admin_token() {
    let h = harness().await;
    let key = h.tenant("acme", 10).await;
    let update = json!({ "clientId": "acme", "allowance": 250 });

    let (status, body, _) = h
        .call(json_request("PATCH", "/admin/clients", Some(key.as_str()), update.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let mut request = json_request("PATCH", "/admin/clients", None, update);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {ADMIN_TOKEN}").parse().unwrap(),
    );
    let (status, body, _) = h.call(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["allowance"], 250);
}

#[tokio::test]
async fn api_keys_are_shown_once_and_revocable() {
    let h = harness().await;
    let key = h.tenant("acme", 10).await;

    let (status, body, _) = h
        .call(json_request("POST", "/v1/api-keys", Some(key.as_str()), json!({ "name": "ci" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_key = body["data"]["key"].as_str().unwrap().to_string();
    let new_id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(new_key.starts_with("sk_"));

    let (_, body, _) = h.call(get("/v1/api-keys", Some(new_key.as_str()))).await;
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|k| k.get("key").is_none() && k.get("keyHash").is_none()));

    let revoke = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/api-keys?id={new_id}"))
        .header("x-api-key", &key)
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = h.call(revoke).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = h.call(get("/v1/api-keys", Some(new_key.as_str()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
