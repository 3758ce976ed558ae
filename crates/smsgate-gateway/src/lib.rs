// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface for smsgate.
//!
//! Thin axum layer over [`smsgate_dispatch::Services`]: resolves the caller,
//! decodes requests, and wraps every result in the `{success, data, meta}`
//! envelope. No business rules live here.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod webhooks;

pub use auth::AuthConfig;
pub use error::{ApiError, ApiJson};
pub use server::{GatewayState, build_router, start_server};
