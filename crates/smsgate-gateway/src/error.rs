// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response envelope and the mapping from [`SmsError`] to HTTP.
//!
//! Every route answers with one of two shapes:
//! - `{"success":true,"data":...,"meta":{...}}`
//! - `{"success":false,"error":{"code":...,"message":...,"details":...}}`

use axum::extract::{FromRequest, Request};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use smsgate_core::SmsError;

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub data: T,
    pub meta: Value,
}

/// Wraps `data` with an empty `meta` object.
pub fn ok<T: Serialize>(data: T) -> Json<ApiSuccess<T>> {
    ok_with_meta(data, json!({}))
}

pub fn ok_with_meta<T: Serialize>(data: T, meta: Value) -> Json<ApiSuccess<T>> {
    Json(ApiSuccess {
        success: true,
        data,
        meta,
    })
}

/// Error returned from handlers and extractors.
#[derive(Debug)]
pub enum ApiError {
    Sms(SmsError),
    /// Request well-formed but not understood, e.g. an unknown campaign action.
    BadRequest(String),
    /// A dependency the service needs is unavailable (503).
    NotReady(String),
}

impl From<SmsError> for ApiError {
    fn from(err: SmsError) -> Self {
        Self::Sms(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Sms(err) => match err {
                SmsError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                SmsError::Unauthorized => StatusCode::UNAUTHORIZED,
                SmsError::Forbidden(_) | SmsError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
                SmsError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                SmsError::NotFound { .. } => StatusCode::NOT_FOUND,
                SmsError::Provider { .. } => StatusCode::BAD_GATEWAY,
                SmsError::Config(_) | SmsError::Storage { .. } | SmsError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotReady(_) => "not_ready",
            Self::Sms(err) => err.code(),
        }
    }

    /// Caller-facing message. Server-side failures are logged and replaced
    /// with a generic message.
    fn message(&self) -> String {
        match self {
            Self::BadRequest(message) | Self::NotReady(message) => message.clone(),
            Self::Sms(SmsError::Validation { message }) => message.clone(),
            Self::Sms(err) if self.status().is_server_error() && !matches!(err, SmsError::Provider { .. }) => {
                tracing::error!(error = %err, "request failed");
                "Unexpected error".to_string()
            }
            Self::Sms(err) => err.to_string(),
        }
    }

    fn details(&self) -> Value {
        match self {
            Self::Sms(SmsError::QuotaExceeded { used, allowance }) => {
                json!({ "used": used, "allowance": allowance })
            }
            Self::Sms(SmsError::RateLimited {
                retry_after_seconds,
            }) => json!({ "retryAfterSeconds": retry_after_seconds }),
            Self::Sms(SmsError::Provider { provider, .. }) => json!({ "provider": provider }),
            _ => Value::Null,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.message(),
                "details": self.details(),
            }
        });
        let mut response = (status, Json(body)).into_response();
        if let Self::Sms(SmsError::RateLimited {
            retry_after_seconds,
        }) = self
        {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
        }
        response
    }
}

/// `Json` extractor whose rejections use the error envelope (422).
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(SmsError::validation(rejection.body_text()).into()),
        }
    }
}
