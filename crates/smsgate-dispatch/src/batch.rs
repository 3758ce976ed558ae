// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV recipient files with merge fields.
//!
//! The header row must contain a `phone` column (any case). Every other
//! column becomes a merge field named after its lowercased header.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use smsgate_core::{PhoneNormalizer, SmsError, compile_template};

use crate::recipients::{InvalidRecipient, rejection};

/// Number of compiled samples returned by a preview.
pub const PREVIEW_SAMPLES: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub csv: String,
    pub message: String,
    #[serde(default)]
    pub commit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecipient {
    pub phone: String,
    pub fields: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub recipients: Vec<BatchRecipient>,
    pub invalid: Vec<InvalidRecipient>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSample {
    pub phone: String,
    pub message: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchPreview {
    pub preview: bool,
    pub total: usize,
    pub invalid: Vec<InvalidRecipient>,
    pub samples: Vec<BatchSample>,
}

/// Parses a recipient file. Row numbers in `invalid` count data rows from 1.
pub fn parse_batch_csv(text: &str, normalizer: &PhoneNormalizer) -> Result<ParsedBatch, SmsError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| SmsError::validation(format!("malformed CSV: {e}")))?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    if header.iter().all(|h| h.is_empty()) {
        return Err(SmsError::validation("CSV file has no rows"));
    }
    let phone_idx = header
        .iter()
        .position(|h| h == "phone")
        .ok_or_else(|| SmsError::validation("CSV header has no `phone` column"))?;

    let mut parsed = ParsedBatch::default();
    let mut seen = HashSet::new();

    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record = record.map_err(|e| SmsError::validation(format!("malformed CSV at row {row}: {e}")))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let raw = record.get(phone_idx).unwrap_or_default();
        let phone = match rejection(normalizer, raw) {
            Ok(phone) => phone,
            Err(reason) => {
                parsed.invalid.push(InvalidRecipient::new(raw, reason).at_row(row));
                continue;
            }
        };
        if !seen.insert(phone.clone()) {
            parsed
                .invalid
                .push(InvalidRecipient::new(raw, "duplicate in file").at_row(row));
            continue;
        }

        let fields = header
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != phone_idx)
            .map(|(j, name)| (name.clone(), record.get(j).unwrap_or_default().to_string()))
            .collect();
        parsed.recipients.push(BatchRecipient { phone, fields });
    }

    Ok(parsed)
}

/// Compiles the first few recipients without sending anything.
pub fn preview(parsed: ParsedBatch, message: &str) -> BatchPreview {
    let samples = parsed
        .recipients
        .iter()
        .take(PREVIEW_SAMPLES)
        .map(|r| {
            let compiled = compile_template(message, &r.fields);
            BatchSample {
                phone: r.phone.clone(),
                message: compiled.text,
                missing: compiled.missing,
            }
        })
        .collect();

    BatchPreview {
        preview: true,
        total: parsed.recipients.len(),
        invalid: parsed.invalid,
        samples,
    }
}
