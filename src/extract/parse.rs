//! Price text normalization.
//!
//! Turkish storefronts format prices as `1.299,90 TL`: `.` groups thousands
//! and `,` marks decimals. The generic fallback can also run into US-style
//! `1,299.99`, so separator roles are decided per string rather than assumed.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::extract::ExtractError;

const CURRENCY_TOKENS: &[&str] = &["TL", "TRY", "₺", "US$", "$", "€", "£"];

/// Parse the text content of a price-bearing element into a number.
pub fn parse_price_text(text: &str) -> Result<Decimal, ExtractError> {
    let original = text.trim().to_string();

    let mut cleaned = original.clone();
    for token in CURRENCY_TOKENS {
        cleaned = cleaned.replace(token, "");
    }
    cleaned.retain(|c| c.is_ascii_digit() || c == '.' || c == ',');
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == ',');

    if cleaned.is_empty() {
        return Err(ExtractError::Malformed { text: original });
    }

    let normalized = normalize_separators(cleaned);
    Decimal::from_str(&normalized).map_err(|_| ExtractError::Malformed { text: original })
}

/// Search free text for the first currency-marked price pattern. Used by the
/// generic strategy when no site-specific selector rule applies.
pub fn find_price_pattern(text: &str) -> Result<Decimal, ExtractError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?:[₺$€£]\s*([0-9][0-9.,]*))|(?:([0-9][0-9.,]*)\s*(?:TL|TRY|₺))")
            .expect("price pattern is valid")
    });

    let mut first_malformed = None;
    for captures in pattern.captures_iter(text) {
        let matched = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match parse_price_text(matched) {
            Ok(price) => return Ok(price),
            Err(err) => {
                if first_malformed.is_none() {
                    first_malformed = Some(err);
                }
            }
        }
    }

    Err(first_malformed.unwrap_or(ExtractError::NotFound))
}

/// Decide which separator is the decimal mark and rewrite to `1234.56` form.
fn normalize_separators(digits: &str) -> String {
    let last_dot = digits.rfind('.');
    let last_comma = digits.rfind(',');

    match (last_dot, last_comma) {
        // Both present: the rightmost one is the decimal mark.
        (Some(dot), Some(comma)) => {
            if comma > dot {
                digits.replace('.', "").replace(',', ".")
            } else {
                digits.replace(',', "")
            }
        }
        // Comma only: Turkish decimal mark.
        (None, Some(_)) => digits.replace(',', "."),
        // Dot only: decimal if it looks like one (a single dot with one or
        // two trailing digits), otherwise a thousands separator.
        (Some(dot), None) => {
            let trailing = digits.len() - dot - 1;
            let single = digits.matches('.').count() == 1;
            if single && (1..=2).contains(&trailing) {
                digits.to_string()
            } else {
                digits.replace('.', "")
            }
        }
        (None, None) => digits.to_string(),
    }
}
