// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Address-book CSV uploads with configurable column mapping.
//!
//! With a header row, columns are located by name (case-insensitive, with
//! whitespace or a single `-` tolerated in the requested name). Without one,
//! phone, name and tag are read from the first three columns.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use smsgate_core::{NewContact, PhoneNormalizer, SmsError};

use crate::recipients::{InvalidRecipient, rejection};

/// Number of parsed contacts echoed back by a preview.
pub const PREVIEW_SAMPLE: usize = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactImportRequest {
    pub csv: String,
    #[serde(default)]
    pub commit: bool,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    #[serde(default)]
    pub name_column: Option<String>,
    #[serde(default)]
    pub phone_column: Option<String>,
    #[serde(default)]
    pub tag_column: Option<String>,
}

fn default_has_header() -> bool {
    true
}

impl ContactImportRequest {
    pub fn new(csv: impl Into<String>) -> Self {
        Self {
            csv: csv.into(),
            commit: false,
            has_header: true,
            name_column: None,
            phone_column: None,
            tag_column: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedContacts {
    /// Non-blank data rows in the file.
    pub total: usize,
    pub contacts: Vec<NewContact>,
    pub invalid: Vec<InvalidRecipient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactImportPreview {
    pub preview: bool,
    pub total: usize,
    pub parsed: usize,
    pub invalid: Vec<InvalidRecipient>,
    pub sample: Vec<NewContact>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactImportSummary {
    pub created: usize,
    pub invalid: Vec<InvalidRecipient>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContactImportOutcome {
    Preview(ContactImportPreview),
    Committed(ContactImportSummary),
}

/// Column positions resolved from the header, or the positional defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    phone: usize,
    name: Option<usize>,
    tag: Option<usize>,
}

impl Columns {
    fn resolve(header: Option<&[String]>, req: &ContactImportRequest) -> Result<Self, SmsError> {
        let Some(header) = header else {
            return Ok(Self {
                phone: 0,
                name: Some(1),
                tag: Some(2),
            });
        };
        let find = |wanted: Option<&String>, default: &str| {
            let wanted = wanted.map_or(default, String::as_str).to_lowercase();
            let candidates = [
                wanted.clone(),
                wanted.split_whitespace().collect::<String>(),
                wanted.replacen('-', "", 1),
            ];
            candidates
                .iter()
                .find_map(|c| header.iter().position(|h| h == c))
        };
        let phone = find(req.phone_column.as_ref(), "phone")
            .ok_or_else(|| SmsError::validation("could not locate the phone column"))?;
        Ok(Self {
            phone,
            name: find(req.name_column.as_ref(), "name"),
            tag: find(req.tag_column.as_ref(), "tag"),
        })
    }
}

/// Parses an upload. Row numbers in `invalid` count data rows from 1.
pub fn parse_contact_csv(
    req: &ContactImportRequest,
    normalizer: &PhoneNormalizer,
) -> Result<ParsedContacts, SmsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(req.csv.as_bytes());

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            SmsError::validation(format!("malformed CSV at line {}: {e}", i + 1))
        })?;
        if !record.iter().all(str::is_empty) {
            rows.push(record);
        }
    }
    if rows.is_empty() {
        return Err(SmsError::validation("CSV file has no rows"));
    }

    let header: Option<Vec<String>> = req
        .has_header
        .then(|| rows.remove(0).iter().map(str::to_lowercase).collect());
    let columns = Columns::resolve(header.as_deref(), req)?;

    let field = |record: &csv::StringRecord, idx: Option<usize>| {
        idx.and_then(|i| record.get(i))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut parsed = ParsedContacts {
        total: rows.len(),
        ..ParsedContacts::default()
    };
    let mut seen = HashSet::new();
    for (i, record) in rows.iter().enumerate() {
        let row = i + 1;
        let raw = record.get(columns.phone).unwrap_or_default();
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
        parsed.contacts.push(NewContact {
            phone,
            name: field(record, columns.name),
            tag: field(record, columns.tag),
        });
    }
    Ok(parsed)
}

pub fn preview(parsed: ParsedContacts) -> ContactImportPreview {
    ContactImportPreview {
        preview: true,
        total: parsed.total,
        parsed: parsed.contacts.len(),
        sample: parsed.contacts.into_iter().take(PREVIEW_SAMPLE).collect(),
        invalid: parsed.invalid,
    }
}
