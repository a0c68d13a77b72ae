// src/extract/clean.rs

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{SkipReason, FALLBACK_YEAR};

static FOOTNOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("footnote regex should compile"));

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(19|20)\d{2}").expect("year regex should compile"));

/// Minimum digit count for a gross value to be trusted.
pub const MIN_GROSS_DIGITS: usize = 9;

/// Strip every `[...]` footnote marker and trim surrounding whitespace.
pub fn clean_title(raw: &str) -> String {
    FOOTNOTE_RE.replace_all(raw, "").trim().to_string()
}

/// Keep only ASCII digits.
pub fn gross_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Clean a gross cell into an integer, or say why it can't be trusted.
pub fn parse_gross(raw: &str) -> Result<u64, SkipReason> {
    let digits = gross_digits(raw);
    if digits.is_empty() {
        return Err(SkipReason::NoGrossDigits);
    }
    if digits.len() < MIN_GROSS_DIGITS {
        return Err(SkipReason::GrossTooShort(digits.len()));
    }
    digits.parse().map_err(|_| SkipReason::GrossUnparseable)
}

/// First 19xx/20xx token in the text, else the fallback year.
pub fn extract_year(raw: &str) -> String {
    YEAR_RE
        .find(raw)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| FALLBACK_YEAR.to_string())
}
