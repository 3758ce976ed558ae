// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient normalization shared by every send path.

use std::collections::HashSet;

use serde::Serialize;
use smsgate_core::{PhoneNormalizer, is_e164};

/// An input phone that was rejected, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRecipient {
    /// 1-based data row, for file uploads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub value: String,
    pub reason: String,
}

impl InvalidRecipient {
    pub fn new(value: &str, reason: &str) -> Self {
        Self {
            row: None,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

/// Why a raw phone could not be used, if it cannot.
pub(crate) fn rejection(normalizer: &PhoneNormalizer, raw: &str) -> Result<String, &'static str> {
    if raw.trim().is_empty() {
        return Err("empty phone");
    }
    let phone = normalizer.normalize(raw);
    if is_e164(&phone) {
        Ok(phone)
    } else {
        Err("invalid E.164")
    }
}

/// Normalizes `raw` phones, keeping the first occurrence of each canonical
/// number. Duplicates are dropped silently; malformed input is reported.
pub fn normalize_recipients<'a, I>(
    normalizer: &PhoneNormalizer,
    raw: I,
) -> (Vec<String>, Vec<InvalidRecipient>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for value in raw {
        match rejection(normalizer, value) {
            Ok(phone) => {
                if seen.insert(phone.clone()) {
                    valid.push(phone);
                }
            }
            Err(reason) => invalid.push(InvalidRecipient::new(value, reason)),
        }
    }
    (valid, invalid)
}
