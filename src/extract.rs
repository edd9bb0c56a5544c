// Shared field extractors.
//
// Each extractor is a pure function of the message text, backed by an
// ordered list of compiled patterns. The messages come from several
// provider templates, so every field tolerates multiple phrasings; the
// first pattern that yields a usable value wins.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

/// Timestamp layout used throughout the SMS dumps (no timezone).
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Transaction ID: (\w+)",
        r"(?i)TxId: (\w+)",
        r"(?i)TxId:(\w+)",
        r"(?i)ID: (\w+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"Date: (\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})",
        r"on (\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})",
        r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static FEE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Fee: (\d+(?:\.\d+)?) RWF").unwrap());

/// Extract the provider transaction identifier, if any marker is present.
///
/// No validation of the id format beyond a non-empty `\w+` capture.
pub fn extract_transaction_id(text: &str) -> Option<String> {
    for pattern in ID_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Extract the transaction timestamp, if any date marker is present.
///
/// A pattern match that fails to parse as a valid calendar timestamp
/// (e.g. "2024-02-30 10:00:00") is skipped and extraction continues with
/// the next pattern rather than failing the whole message.
pub fn extract_occurred_at(text: &str) -> Option<NaiveDateTime> {
    for pattern in DATE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            if let Ok(dt) = NaiveDateTime::parse_from_str(&caps[1], DATETIME_FORMAT) {
                return Some(dt);
            }
        }
    }
    None
}

/// Extract the fee amount. An absent "Fee:" marker means the fee is
/// exactly 0, not unknown.
pub fn extract_fee(text: &str) -> f64 {
    FEE_PATTERN
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0.0)
}
