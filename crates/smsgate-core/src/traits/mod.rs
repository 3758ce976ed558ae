// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Providers and storage backends extend the [`PluginAdapter`] base trait and
//! use `#[async_trait]` so they can be held as trait objects.

pub mod adapter;
pub mod clock;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use clock::{Clock, SystemClock};
pub use provider::SmsProvider;
pub use storage::StorageAdapter;
