// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so that typos fail at
//! startup instead of silently falling back to defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level smsgate configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsgateConfig {
    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub phone: PhoneConfig,

    /// Primary gateway.
    #[serde(default)]
    pub bulksms: BulkSmsConfig,

    /// Secondary (fallback) gateway.
    #[serde(default)]
    pub africastalking: AfricasTalkingConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub idempotency: IdempotencyConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "smsgate".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP listener and operator credentials.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token granting the admin context. `None` disables bearer auth.
    #[serde(default)]
    pub admin_token: Option<String>,

    /// When set, `/api/cron/dispatch` requires a matching `X-Cron-Secret` header.
    #[serde(default)]
    pub cron_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_token: None,
            cron_secret: None,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[REDACTED]"))
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// SQLite storage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("smsgate").join("smsgate.db"))
        .and_then(|p| p.to_str().map(str::to_string))
        .unwrap_or_else(|| "smsgate.db".to_string())
}

fn default_true() -> bool {
    true
}

/// Phone normalization settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PhoneConfig {
    /// Country code applied to national numbers with a single leading `0`.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            default_country_code: default_country_code(),
        }
    }
}

fn default_country_code() -> String {
    "+27".to_string()
}

/// BulkSMS (primary gateway) settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BulkSmsConfig {
    #[serde(default = "default_bulksms_url")]
    pub base_url: String,

    /// Full `Authorization` header value, e.g. `Basic dXNlcjpwYXNz`.
    #[serde(default)]
    pub auth_header: Option<String>,
}

impl Default for BulkSmsConfig {
    fn default() -> Self {
        Self {
            base_url: default_bulksms_url(),
            auth_header: None,
        }
    }
}

impl std::fmt::Debug for BulkSmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkSmsConfig")
            .field("base_url", &self.base_url)
            .field("auth_header", &self.auth_header.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn default_bulksms_url() -> String {
    "https://api.bulksms.com/v1/messages".to_string()
}

/// Africa's Talking (secondary gateway) settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AfricasTalkingConfig {
    #[serde(default = "default_africastalking_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_africastalking_username")]
    pub username: String,
}

impl Default for AfricasTalkingConfig {
    fn default() -> Self {
        Self {
            base_url: default_africastalking_url(),
            api_key: None,
            username: default_africastalking_username(),
        }
    }
}

impl std::fmt::Debug for AfricasTalkingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AfricasTalkingConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .finish()
    }
}

fn default_africastalking_url() -> String {
    "https://api.sandbox.africastalking.com/version1/messaging".to_string()
}

fn default_africastalking_username() -> String {
    "sandbox".to_string()
}

/// Retry budgets, batching and accounting for outbound sends.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    #[serde(default = "default_attempts")]
    pub primary_attempts: u32,

    #[serde(default = "default_primary_delay_ms")]
    pub primary_base_delay_ms: u64,

    #[serde(default = "default_attempts")]
    pub secondary_attempts: u32,

    #[serde(default = "default_secondary_delay_ms")]
    pub secondary_base_delay_ms: u64,

    /// Queued messages processed per campaign per loop iteration.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Cost recorded per successfully sent message.
    #[serde(default = "default_message_cost")]
    pub message_cost: f64,

    /// In-process dispatch ticker period for `serve`. 0 disables it.
    #[serde(default)]
    pub interval_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            primary_attempts: default_attempts(),
            primary_base_delay_ms: default_primary_delay_ms(),
            secondary_attempts: default_attempts(),
            secondary_base_delay_ms: default_secondary_delay_ms(),
            batch_size: default_batch_size(),
            message_cost: default_message_cost(),
            interval_secs: 0,
        }
    }
}

fn default_attempts() -> u32 {
    3
}

fn default_primary_delay_ms() -> u64 {
    200
}

fn default_secondary_delay_ms() -> u64 {
    300
}

fn default_batch_size() -> usize {
    100
}

fn default_message_cost() -> f64 {
    0.25
}

/// Per-plan sliding-window admission control.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Fixed hint returned to callers that are over the cap.
    #[serde(default = "default_window_secs")]
    pub retry_after_secs: u64,

    /// Messages per window, keyed by plan name.
    #[serde(default = "default_plans")]
    pub plans: BTreeMap<String, u32>,

    /// Plan whose cap applies to unknown plan names.
    #[serde(default = "default_plan")]
    pub default_plan: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            retry_after_secs: default_window_secs(),
            plans: default_plans(),
            default_plan: default_plan(),
        }
    }
}

fn default_window_secs() -> u64 {
    60
}

fn default_plans() -> BTreeMap<String, u32> {
    BTreeMap::from([
        ("starter".to_string(), 30),
        ("business".to_string(), 120),
        ("pro".to_string(), 300),
    ])
}

fn default_plan() -> String {
    "starter".to_string()
}

/// Duplicate request suppression window.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdempotencyConfig {
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
        }
    }
}

fn default_window_hours() -> u64 {
    24
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SmsgateConfig::default();
        assert_eq!(config.phone.default_country_code, "+27");
        assert_eq!(config.dispatch.batch_size, 100);
        assert_eq!(config.dispatch.primary_attempts, 3);
        assert_eq!(config.dispatch.secondary_base_delay_ms, 300);
        assert_eq!(config.rate_limit.plans.get("business"), Some(&120));
        assert_eq!(config.idempotency.window_hours, 24);
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = SmsgateConfig::default();
        config.server.admin_token = Some("super-secret".into());
        config.bulksms.auth_header = Some("Basic abc123".into());
        config.africastalking.api_key = Some("atsk_live".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("abc123"));
        assert!(!rendered.contains("atsk_live"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn unknown_field_rejected() {
        let result = toml::from_str::<SmsgateConfig>("[dispatch]\nbatchsize = 5\n");
        assert!(result.is_err());
    }

    #[test]
    fn custom_plans_replace_defaults() {
        let config: SmsgateConfig =
            toml::from_str("[rate_limit]\nplans = { free = 5 }\ndefault_plan = \"free\"\n")
                .unwrap();
        assert_eq!(config.rate_limit.plans.len(), 1);
        assert_eq!(config.rate_limit.default_plan, "free");
    }
}
