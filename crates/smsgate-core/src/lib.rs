// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for smsgate.
//!
//! This crate provides the error taxonomy, domain types and adapter traits
//! used throughout the workspace, plus the two pure helpers every send path
//! relies on: phone normalization and template compilation.

pub mod error;
pub mod phone;
pub mod template;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SmsError;
pub use phone::{PhoneNormalizer, is_e164};
pub use template::{CompiledTemplate, compile_template, extract_variables};
pub use types::{
    AdapterType, ApiKey, AuditEntry, Campaign, CampaignMessage, CampaignStats, CampaignStatus,
    Client, ClientContext, Contact, HealthStatus, MessageStatus, MessageTemplate,
    NewCampaignMessage, NewContact, ProviderReceipt, SmsTransaction, SuppressionEntry, Tag,
};

pub use traits::clock::{format_timestamp, parse_rfc3339};
pub use traits::{Clock, PluginAdapter, SmsProvider, StorageAdapter, SystemClock};
