//! Lenient due date parsing
//!
//! The scraper normally hands over ISO dates, but falls back to the raw page
//! text when it could not parse one. Both shapes are accepted here.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d-%b-%y",
];

const PREFIXES: &[&str] = &["return by", "expires", "expire", "due"];

/// Parse a due date, returning `None` when no known format matches.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = strip_prefix(raw.trim());
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(cleaned, format).ok())
}

fn strip_prefix(text: &str) -> &str {
    let lower = text.to_lowercase();
    for prefix in PREFIXES {
        if lower.starts_with(prefix) && text.is_char_boundary(prefix.len()) {
            return text[prefix.len()..].trim_start_matches(|c: char| c == ':' || c.is_whitespace());
        }
    }
    text
}
