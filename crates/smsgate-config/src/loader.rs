// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `/etc/smsgate/smsgate.toml`
//! 3. `~/.config/smsgate/smsgate.toml`
//! 4. `./smsgate.toml`
//! 5. `SMSGATE_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SmsgateConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/smsgate/smsgate.toml";

/// Top-level section names recognized in environment variable keys.
const SECTIONS: &[&str] = &[
    "africastalking",
    "idempotency",
    "rate_limit",
    "dispatch",
    "bulksms",
    "storage",
    "server",
    "phone",
    "app",
];

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<SmsgateConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SmsgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SmsgateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SmsgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SmsgateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SmsgateConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("smsgate/smsgate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("smsgate.toml"))
        .merge(env_provider())
}

/// Maps `SMSGATE_SECTION_KEY` onto `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `SMSGATE_SERVER_ADMIN_TOKEN` must become `server.admin_token`.
fn env_provider() -> Env {
    Env::prefixed("SMSGATE_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}
