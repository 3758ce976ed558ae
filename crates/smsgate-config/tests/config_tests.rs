// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the configuration system.

use smsgate_config::diagnostic::{ConfigError, suggest_key};
use smsgate_config::model::SmsgateConfig;
use smsgate_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[app]
name = "gateway-eu"
log_level = "debug"

[server]
host = "0.0.0.0"
port = 8080
admin_token = "adm"
cron_secret = "cron"

[storage]
database_path = "/tmp/sms.db"
wal_mode = false

[phone]
default_country_code = "+254"

[bulksms]
base_url = "http://localhost:9000/v1/messages"
auth_header = "Basic Zm9vOmJhcg=="

[africastalking]
base_url = "http://localhost:9001/messaging"
api_key = "at-key"
username = "acme"

[dispatch]
primary_attempts = 2
primary_base_delay_ms = 50
secondary_attempts = 4
secondary_base_delay_ms = 75
batch_size = 25
message_cost = 0.5
interval_secs = 30

[rate_limit]
window_secs = 120
retry_after_secs = 30
default_plan = "business"

[idempotency]
window_hours = 48
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.app.name, "gateway-eu");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.admin_token.as_deref(), Some("adm"));
    assert!(!config.storage.wal_mode);
    assert_eq!(config.phone.default_country_code, "+254");
    assert_eq!(config.africastalking.username, "acme");
    assert_eq!(config.dispatch.batch_size, 25);
    assert_eq!(config.dispatch.interval_secs, 30);
    assert_eq!(config.rate_limit.retry_after_secs, 30);
    assert_eq!(config.rate_limit.plans.get("pro"), Some(&300));
    assert_eq!(config.idempotency.window_hours, 48);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.app.name, "smsgate");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3000);
    assert!(config.server.admin_token.is_none());
    assert!(config.storage.wal_mode);
    assert_eq!(config.dispatch.primary_base_delay_ms, 200);
    assert_eq!(config.rate_limit.window_secs, 60);
    assert_eq!(config.rate_limit.default_plan, "starter");
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = "[server]\nadmin_tokn = \"x\"\n";
    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "admin_tokn");
            assert_eq!(suggestion.as_deref(), Some("admin_token"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[server]\nport = \"eighty\"\n").unwrap_err();
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

#[test]
fn validation_runs_after_load() {
    let errors = load_and_validate_str("[dispatch]\nbatch_size = 0\n").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("batch_size")))
    );
}

#[test]
fn plans_merge_over_defaults() {
    let config =
        load_and_validate_str("[rate_limit.plans]\nenterprise = 1000\n").expect("valid");
    assert_eq!(config.rate_limit.plans.get("enterprise"), Some(&1000));
    assert_eq!(config.rate_limit.plans.get("starter"), Some(&30));
}

#[test]
fn env_style_override_wins() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: SmsgateConfig = Figment::new()
        .merge(Serialized::defaults(SmsgateConfig::default()))
        .merge(Toml::string("[server]\nport = 4000\n"))
        .merge(("server.port", 5000))
        .merge(("phone.default_country_code", "+44"))
        .extract()
        .expect("should extract");

    assert_eq!(config.server.port, 5000);
    assert_eq!(config.phone.default_country_code, "+44");
}

#[test]
fn suggest_key_is_public() {
    assert_eq!(
        suggest_key("wal_mod", &["database_path", "wal_mode"]),
        Some("wal_mode".to_string())
    );
}

#[test]
fn errors_render_as_diagnostics() {
    use miette::Diagnostic;

    let errors = load_and_validate_str("[phone]\ncountry = \"+27\"\n").unwrap_err();
    let code = errors[0].code().map(|c| c.to_string());
    assert_eq!(code.as_deref(), Some("smsgate::config::unknown_key"));
}
