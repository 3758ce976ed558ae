// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::SmsgateConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validates a deserialized configuration, collecting every problem found.
pub fn validate_config(config: &SmsgateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.app.log_level.as_str()) {
        fail(format!(
            "app.log_level `{}` must be one of {}",
            config.app.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let cc = config.phone.default_country_code.trim_start_matches('+');
    if cc.is_empty() || cc.len() > 3 || !cc.bytes().all(|b| b.is_ascii_digit()) {
        fail(format!(
            "phone.default_country_code `{}` must be 1-3 digits, optionally prefixed with `+`",
            config.phone.default_country_code
        ));
    }

    for (name, url) in [
        ("bulksms.base_url", &config.bulksms.base_url),
        ("africastalking.base_url", &config.africastalking.base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!("{name} `{url}` must be an http(s) URL"));
        }
    }

    if config.dispatch.primary_attempts == 0 {
        fail("dispatch.primary_attempts must be at least 1".to_string());
    }
    if config.dispatch.secondary_attempts == 0 {
        fail("dispatch.secondary_attempts must be at least 1".to_string());
    }
    if config.dispatch.batch_size == 0 {
        fail("dispatch.batch_size must be at least 1".to_string());
    }
    if config.dispatch.message_cost.is_nan() || config.dispatch.message_cost < 0.0 {
        fail(format!(
            "dispatch.message_cost must be non-negative, got {}",
            config.dispatch.message_cost
        ));
    }

    if config.rate_limit.window_secs == 0 {
        fail("rate_limit.window_secs must be at least 1".to_string());
    }
    if !config
        .rate_limit
        .plans
        .contains_key(&config.rate_limit.default_plan)
    {
        fail(format!(
            "rate_limit.default_plan `{}` is not listed in rate_limit.plans",
            config.rate_limit.default_plan
        ));
    }

    if config.idempotency.window_hours == 0 {
        fail("idempotency.window_hours must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
