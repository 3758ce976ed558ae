// SPDX-FileCopyrightText: 2026 smsgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort canonicalization of free-form phone input.

use std::sync::LazyLock;

use regex::Regex;

static E164: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+\d{9,15}$").unwrap());

/// Whether `phone` has the shape `+` followed by 9 to 15 digits.
///
/// The normalizer never enforces this itself; callers check it after
/// normalizing.
pub fn is_e164(phone: &str) -> bool {
    E164.is_match(phone)
}

/// Rewrites phone numbers into an E.164-like form.
///
/// National numbers (a single leading `0`) are expanded with the configured
/// default country code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNormalizer {
    country_code: String,
}

impl Default for PhoneNormalizer {
    fn default() -> Self {
        Self::new("+27")
    }
}

impl PhoneNormalizer {
    /// `country_code` may be given with or without the leading `+`.
    pub fn new(country_code: impl Into<String>) -> Self {
        let code: String = country_code.into();
        let digits = code.trim().trim_start_matches('+');
        Self {
            country_code: format!("+{digits}"),
        }
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Canonicalizes `input`. Anything that matches none of the rules is
    /// returned stripped but otherwise unchanged.
    pub fn normalize(&self, input: &str) -> String {
        let mut s: String = input
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
            .collect();

        if let Some(rest) = s.strip_prefix("00") {
            s = format!("+{rest}");
        }

        if !s.starts_with('+') {
            if s.starts_with('0') && s.len() >= 10 {
                s = format!("{}{}", self.country_code, &s[1..]);
            } else if (9..=15).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit()) {
                s.insert(0, '+');
            }
        }

        s
    }

    /// Normalizes and keeps the result only if it is E.164-shaped.
    pub fn normalize_valid(&self, input: &str) -> Option<String> {
        let phone = self.normalize(input);
        is_e164(&phone).then_some(phone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn south_african_variants_converge() {
        let n = PhoneNormalizer::default();
        for raw in ["0821234567", "+27821234567", "0027821234567"] {
            assert_eq!(n.normalize(raw), "+27821234567", "input {raw}");
        }
    }

    #[test]
    fn strips_punctuation_and_whitespace() {
        let n = PhoneNormalizer::default();
        assert_eq!(n.normalize("  (082) 123-4567 "), "+27821234567");
        assert_eq!(n.normalize("+44 20\t7946 0958"), "+442079460958");
    }

    #[test]
    fn bare_international_digits_get_plus() {
        let n = PhoneNormalizer::default();
        assert_eq!(n.normalize("254712345678"), "+254712345678");
    }

    #[test]
    fn short_national_number_left_alone() {
        let n = PhoneNormalizer::default();
        assert_eq!(n.normalize("012345"), "012345");
        assert!(!is_e164("012345"));
    }

    #[test]
    fn configured_country_code() {
        let n = PhoneNormalizer::new("254");
        assert_eq!(n.country_code(), "+254");
        assert_eq!(n.normalize("0712345678"), "+254712345678");
    }

    #[test]
    fn garbage_is_not_valid() {
        let n = PhoneNormalizer::default();
        assert_eq!(n.normalize_valid("call me"), None);
        assert_eq!(n.normalize_valid(""), None);
        assert_eq!(
            n.normalize_valid("082 123 4567").as_deref(),
            Some("+27821234567")
        );
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in "[0-9+() -]{0,20}") {
            let n = PhoneNormalizer::default();
            let once = n.normalize(&raw);
            prop_assert_eq!(n.normalize(&once), once.clone());
        }

        #[test]
        fn valid_output_matches_shape(digits in "[1-9][0-9]{8,14}") {
            let n = PhoneNormalizer::default();
            let phone = n.normalize(&digits);
            prop_assert!(is_e164(&phone));
        }
    }
}
