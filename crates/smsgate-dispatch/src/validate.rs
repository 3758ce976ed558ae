// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input length checks applied before any side effect.

use smsgate_core::SmsError;

/// Longest body accepted for a single SMS segment.
pub const MAX_MESSAGE_CHARS: usize = 160;

/// Requires `value` to hold between `min` and `max` characters (inclusive).
pub(crate) fn length(field: &str, value: &str, min: usize, max: usize) -> Result<(), SmsError> {
    let len = value.chars().count();
    if len < min {
        return Err(SmsError::validation(format!("`{field}` is required")));
    }
    if len > max {
        return Err(SmsError::validation(format!(
            "`{field}` must be at most {max} characters (got {len})"
        )));
    }
    Ok(())
}

pub(crate) fn message(value: &str) -> Result<(), SmsError> {
    length("message", value, 1, MAX_MESSAGE_CHARS)
}

/// Optional field: only the upper bound applies.
pub(crate) fn optional(field: &str, value: Option<&str>, max: usize) -> Result<(), SmsError> {
    match value {
        Some(v) => length(field, v, 0, max),
        None => Ok(()),
    }
}
