// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound SMS gateway trait.

use async_trait::async_trait;

use crate::error::SmsError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ProviderReceipt;

/// A thin client for one upstream SMS gateway.
///
/// Implementations make exactly one HTTP call per [`send`](SmsProvider::send)
/// and never retry internally. Any non-2xx response, transport failure or
/// unparseable body is returned as [`SmsError::Provider`] with the underlying
/// cause attached.
#[async_trait]
pub trait SmsProvider: PluginAdapter {
    /// Submits one message to one recipient.
    async fn send(&self, to: &str, body: &str) -> Result<ProviderReceipt, SmsError>;
}
