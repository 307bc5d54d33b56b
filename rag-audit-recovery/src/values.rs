//! Value decoding shared by the strict and salvage paths, so both produce
//! identical field values for identical input.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rag_audit_core::RawRecord;
use serde_json::Value;
use sha2::{Digest, Sha256};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Epoch values above this are taken to be milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Deterministic id for records that carry none.
pub fn synthesize_turn_id(raw: &RawRecord) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    format!("turn-{}", &hex::encode(digest)[..16])
}

/// Trims and drops blank strings.
pub fn normalize_text(text: Option<String>) -> Option<String> {
    text.and_then(|t| {
        let trimmed = t.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == t.len() {
            Some(t)
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Accepts RFC 3339, naive ISO-8601 (read as UTC) and epoch seconds or millis.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    text.parse::<i64>().ok().and_then(timestamp_from_epoch)
}

pub fn timestamp_from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value < 0 {
        return None;
    }
    if value > EPOCH_MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}

pub fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(timestamp_from_epoch),
        _ => None,
    }
}

/// A string id or an integer id rendered as text.
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_text(Some(s.clone())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A context snippet given either as a bare string or as an object with a
/// text-bearing key.
pub fn snippet_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_text(Some(s.clone())),
        Value::Object(map) => ["text", "content", "page_content"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .and_then(|s| normalize_text(Some(s.to_string()))),
        _ => None,
    }
}

/// Decodes the body of a quoted literal. Unknown escapes keep the escaped
/// character; a dangling backslash is dropped.
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = match u32::from_str_radix(&hex, 16).ok() {
                    Some(high @ 0xD800..=0xDBFF) => match trailing_low_surrogate(chars.as_str()) {
                        Some(low) => {
                            chars.nth(5);
                            char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
                        }
                        None => None,
                    },
                    Some(unit) => char::from_u32(unit),
                    None => None,
                };
                out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}

/// The low half of a surrogate pair when `rest` starts with its `\uXXXX`
/// escape.
fn trailing_low_surrogate(rest: &str) -> Option<u32> {
    rest.strip_prefix("\\u")
        .and_then(|r| r.get(..4))
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .filter(|unit| (0xDC00..=0xDFFF).contains(unit))
}
