// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for smsgate integration tests.
//!
//! Provides fakes for the injected collaborators so that dispatch and gateway
//! tests run without network access or wall-clock waits.
//!
//! # Components
//!
//! - [`MockSmsProvider`] - scripted gateway with call counting
//! - [`ManualClock`] - clock that only moves when told to
//! - [`TestDb`] - throwaway SQLite storage with seed helpers

pub mod clock;
pub mod mock_provider;
pub mod test_db;

pub use clock::ManualClock;
pub use mock_provider::{MockOutcome, MockSmsProvider};
pub use test_db::TestDb;
