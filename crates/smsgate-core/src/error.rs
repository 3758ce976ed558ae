// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for smsgate.

use thiserror::Error;

/// The primary error type used across all smsgate crates.
#[derive(Debug, Error)]
pub enum SmsError {
    /// Configuration errors (invalid TOML, missing credentials, bad header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, row mapping).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Upstream SMS gateway failure (non-2xx, network error, malformed body).
    #[error("provider error ({provider}): {message}")]
    Provider {
        provider: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed input rejected before any side effect.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated caller lacks the required role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Client has used up its message allowance.
    #[error("quota exceeded: {used} of {allowance} messages used")]
    QuotaExceeded { used: i64, allowance: i64 },

    /// Per-plan send rate exceeded for the trailing window.
    #[error("rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    /// Referenced entity does not exist (or is not visible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SmsError {
    /// Shorthand for a [`SmsError::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`SmsError::Provider`] without an underlying source.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Short machine-readable code used in API error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Storage { .. } => "storage_error",
            Self::Provider { .. } => "provider_error",
            Self::Validation { .. } => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::RateLimited { .. } => "rate_limited",
            Self::NotFound { .. } => "not_found",
            Self::Internal(_) => "server_error",
        }
    }
}
