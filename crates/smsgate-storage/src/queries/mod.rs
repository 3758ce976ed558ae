// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, one module per table group.
//!
//! Every function takes `&Database` and runs on its single writer thread.

pub mod api_keys;
pub mod audit;
pub mod campaigns;
pub mod clients;
pub mod contacts;
pub mod idempotency;
pub mod suppression;
pub mod templates;
pub mod transactions;
