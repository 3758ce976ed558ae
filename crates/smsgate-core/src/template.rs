// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merge-field substitution for message bodies.
//!
//! Placeholders look like `{field_name}` (ASCII alphanumerics and underscore).
//! Anything else in braces is plain text.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-zA-Z0-9_]+)\}").unwrap());

/// Result of compiling a template against one set of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    pub text: String,
    /// Placeholder names without a value, first occurrence order, no repeats.
    pub missing: Vec<String>,
}

impl CompiledTemplate {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Substitutes `values` into `template`.
///
/// Unresolved placeholders stay in the output literally and are listed in
/// [`CompiledTemplate::missing`]. Never fails.
pub fn compile_template(template: &str, values: &HashMap<String, String>) -> CompiledTemplate {
    let mut missing: Vec<String> = Vec::new();
    let text = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        match values.get(name) {
            Some(value) => value.clone(),
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    CompiledTemplate {
        text: text.into_owned(),
        missing,
    }
}

/// Distinct placeholder names in `template`, in first occurrence order.
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
