// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the authenticated REST API and the probes.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};
use smsgate_core::{ClientContext, HealthStatus, NewContact, SmsError, format_timestamp};
use smsgate_dispatch::{
    AllowanceUpdate, AuditQuery, BatchRequest, ContactImportRequest, ContactUpdate,
    CreateCampaignRequest, NewTemplate, ScheduleRequest, SendRequest,
};

use crate::auth::header_str;
use crate::error::{ApiError, ApiJson, ApiSuccess, ok, ok_with_meta};
use crate::server::GatewayState;

type ApiResult = Result<Json<ApiSuccess<Value>>, ApiError>;

fn to_value<T: serde::Serialize>(data: T) -> Result<Value, ApiError> {
    serde_json::to_value(data).map_err(|e| SmsError::Internal(e.to_string()).into())
}

/// `Idempotency-Key`, falling back to `X-Idempotency-Key`.
fn idempotency_key(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, "idempotency-key").or_else(|| header_str(headers, "x-idempotency-key"))
}

// --- Probes ---

/// GET /health
pub async fn health(State(state): State<GatewayState>) -> Json<ApiSuccess<Value>> {
    ok(json!({
        "status": "live",
        "timestamp": format_timestamp(state.clock.now()),
    }))
}

/// GET /ready
///
/// 503 `not_ready` when the storage health check fails.
pub async fn ready(State(state): State<GatewayState>) -> ApiResult {
    match state.storage.health_check().await {
        Ok(HealthStatus::Healthy) | Ok(HealthStatus::Degraded(_)) => Ok(ok(json!({
            "status": "ready",
            "db": "connected",
            "timestamp": format_timestamp(state.clock.now()),
        }))),
        Ok(HealthStatus::Unhealthy(reason)) => Err(ApiError::NotReady(reason)),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            Err(ApiError::NotReady("Database connection failed".to_string()))
        }
    }
}

// --- Sending ---

/// POST /v1/sms
pub async fn send_sms(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<SendRequest>,
) -> ApiResult {
    let outcome = state
        .services
        .send
        .send(&ctx, req, idempotency_key(&headers))
        .await?;
    Ok(ok(to_value(outcome)?))
}

/// POST /v1/sms/batch
pub async fn send_batch(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    ApiJson(req): ApiJson<BatchRequest>,
) -> ApiResult {
    let outcome = state.services.send.batch(&ctx, req).await?;
    Ok(ok(to_value(outcome)?))
}

// --- Campaigns ---

/// GET /v1/campaigns
pub async fn list_campaigns(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
) -> ApiResult {
    let campaigns = state.services.campaigns.list(&ctx).await?;
    let count = campaigns.len();
    Ok(ok_with_meta(to_value(campaigns)?, json!({ "count": count })))
}

/// POST /v1/campaigns
pub async fn create_campaign(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    ApiJson(req): ApiJson<CreateCampaignRequest>,
) -> ApiResult {
    let created = state.services.campaigns.create(&ctx, req).await?;
    Ok(ok(to_value(created)?))
}

/// POST /v1/campaigns/schedule
pub async fn schedule_campaign(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    ApiJson(req): ApiJson<ScheduleRequest>,
) -> ApiResult {
    let campaign = state.services.campaigns.schedule(&ctx, req).await?;
    Ok(ok(to_value(campaign)?))
}

/// GET /v1/campaigns/{id}
pub async fn get_campaign(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let details = state.services.campaigns.details(&ctx, &id).await?;
    Ok(ok(to_value(details)?))
}

#[derive(Debug, Deserialize)]
pub struct CampaignAction {
    pub action: String,
}

/// POST /v1/campaigns/{id}
pub async fn campaign_action(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CampaignAction>,
) -> ApiResult {
    match body.action.as_str() {
        "resend-failed" => {
            let outcome = state.services.campaigns.resend_failed(&ctx, &id).await?;
            Ok(ok(to_value(outcome)?))
        }
        other => Err(ApiError::BadRequest(format!("unknown action `{other}`"))),
    }
}

// --- Contacts ---

#[derive(Debug, Deserialize)]
pub struct ContactQuery {
    #[serde(default)]
    pub tag: Option<String>,
}

/// Either a single contact or `{"contacts":[...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContactsBody {
    Bulk { contacts: Vec<NewContact> },
    Single(NewContact),
}

/// GET /v1/contacts
pub async fn list_contacts(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    Query(query): Query<ContactQuery>,
) -> ApiResult {
    let contacts = state
        .services
        .contacts
        .list(&ctx, query.tag.as_deref())
        .await?;
    let count = contacts.len();
    Ok(ok_with_meta(to_value(contacts)?, json!({ "count": count })))
}

/// POST /v1/contacts
pub async fn create_contacts(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    ApiJson(body): ApiJson<ContactsBody>,
) -> ApiResult {
    let contacts = &state.services.contacts;
    match body {
        ContactsBody::Single(contact) => Ok(ok(to_value(contacts.create(&ctx, contact).await?)?)),
        ContactsBody::Bulk { contacts: batch } => {
            let import = contacts.create_many(&ctx, batch).await?;
            Ok(ok(json!({
                "created": import.created.len(),
                "contacts": to_value(&import.created)?,
                "invalid": to_value(&import.invalid)?,
            })))
        }
    }
}

/// PATCH /v1/contacts/{id}
pub async fn update_contact(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ContactUpdate>,
) -> ApiResult {
    let contact = state.services.contacts.update(&ctx, &id, update).await?;
    Ok(ok(to_value(contact)?))
}

/// DELETE /v1/contacts/{id}
pub async fn delete_contact(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    Path(id): Path<String>,
) -> ApiResult {
    state.services.contacts.delete(&ctx, &id).await?;
    Ok(ok(json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct BulkDelete {
    pub ids: Vec<String>,
}

/// DELETE /v1/contacts
pub async fn delete_contacts(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    ApiJson(body): ApiJson<BulkDelete>,
) -> ApiResult {
    let deleted = state.services.contacts.delete_many(&ctx, &body.ids).await?;
    Ok(ok(json!({ "deleted": deleted })))
}

/// POST /v1/contacts/upload
///
/// Previews unless `commit` is true.
pub async fn upload_contacts(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    ApiJson(req): ApiJson<ContactImportRequest>,
) -> ApiResult {
    let outcome = state.services.contacts.import(&ctx, req).await?;
    Ok(ok(to_value(outcome)?))
}

// --- Tags ---

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: String,
}

/// GET /v1/tags
pub async fn list_tags(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
) -> ApiResult {
    let tags = state.services.contacts.list_tags(&ctx).await?;
    Ok(ok(to_value(tags)?))
}

/// POST /v1/tags
pub async fn create_tag(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    ApiJson(req): ApiJson<CreateTagRequest>,
) -> ApiResult {
    let tag = state.services.contacts.create_tag(&ctx, &req.name).await?;
    Ok(ok(to_value(tag)?))
}

// --- Templates ---

/// GET /v1/templates
pub async fn list_templates(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
) -> ApiResult {
    let templates = state.services.templates.list(&ctx).await?;
    Ok(ok(to_value(templates)?))
}

/// POST /v1/templates
pub async fn create_template(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    ApiJson(template): ApiJson<NewTemplate>,
) -> ApiResult {
    let template = state.services.templates.create(&ctx, template).await?;
    Ok(ok(to_value(template)?))
}

// --- API keys ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Honoured for admin callers only.
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevokeQuery {
    pub id: String,
}

/// GET /v1/api-keys
pub async fn list_api_keys(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
) -> ApiResult {
    let keys = state.services.api_keys.list(&ctx).await?;
    Ok(ok(to_value(keys)?))
}

/// POST /v1/api-keys
///
/// The raw key is only ever returned here.
pub async fn create_api_key(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    ApiJson(req): ApiJson<CreateApiKeyRequest>,
) -> ApiResult {
    let client_id = match (ctx.is_admin, req.client_id) {
        (true, Some(client_id)) => client_id,
        (true, None) => return Err(SmsError::validation("`clientId` is required").into()),
        (false, _) => ctx.client_id.clone(),
    };
    let created = state.services.api_keys.create(&client_id, req.name).await?;
    Ok(ok(to_value(created)?))
}

/// DELETE /v1/api-keys?id=...
pub async fn revoke_api_key(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    Query(query): Query<RevokeQuery>,
) -> ApiResult {
    state.services.api_keys.revoke(&ctx, &query.id).await?;
    Ok(ok(json!({ "revoked": true })))
}

// --- Admin ---

/// PATCH /admin/clients
pub async fn update_client_allowance(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    ApiJson(update): ApiJson<AllowanceUpdate>,
) -> ApiResult {
    let client = state.services.admin.update_allowance(&ctx, update).await?;
    Ok(ok(to_value(client)?))
}

/// GET /admin/audit-logs?limit=&offset=&adminId=
pub async fn list_audit_logs(
    State(state): State<GatewayState>,
    Extension(ctx): Extension<ClientContext>,
    Query(query): Query<AuditQuery>,
) -> ApiResult {
    let page = state.services.admin.audit_logs(&ctx, query).await?;
    Ok(ok(to_value(page)?))
}
