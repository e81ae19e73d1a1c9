//! ISO-8601 normalization for JSON payloads held at rest.
//!
//! Request payloads are stored as JSON, so every date and datetime leaf must
//! round-trip losslessly through text. [`normalize_dates`] walks a JSON value
//! and rewrites any string that reads as a calendar date or a timestamp into
//! its canonical ISO-8601 form: dates stay `YYYY-MM-DD`, timestamps use a `T`
//! separator and spell a UTC suffix as `+00:00`. The walk is idempotent;
//! applying it to already-normalized data changes nothing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Recursively canonicalize date/datetime strings inside a JSON value.
pub fn normalize_dates(value: Value) -> Value {
    match value {
        Value::String(text) => match canonical_date_or_datetime(&text) {
            Some(canonical) => Value::String(canonical),
            None => Value::String(text),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_dates).collect()),
        Value::Object(entries) => {
            Value::Object(entries.into_iter().map(|(key, item)| (key, normalize_dates(item))).collect())
        }
        other => other,
    }
}

/// `YYYY-MM-DD` and nothing else.
pub fn is_date_string(text: &str) -> bool {
    text.len() == 10 && NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

/// A date part followed by `T` or a space and at least `HH:MM:SS`.
pub fn is_datetime_string(text: &str) -> bool {
    canonical_datetime(text).is_some()
}

fn canonical_date_or_datetime(text: &str) -> Option<String> {
    if is_date_string(text) {
        return Some(text.to_string());
    }
    canonical_datetime(text)
}

fn canonical_datetime(text: &str) -> Option<String> {
    // `get` rather than slicing: byte 10 may fall inside a multi-byte char.
    let date_part = text.get(..10)?;
    if text.len() < 19 || !is_date_string(date_part) {
        return None;
    }
    let separator = text.as_bytes()[10];
    if separator != b'T' && separator != b' ' {
        return None;
    }

    let mut candidate = text.replacen(separator as char, "T", 1);
    if let Some(stripped) = candidate.strip_suffix('Z') {
        candidate = format!("{stripped}+00:00");
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&candidate) {
        return Some(parsed.to_rfc3339());
    }

    // Offset-free timestamps are kept naive, the same way they were written.
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&candidate, pattern) {
            return Some(parsed.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn dates_are_recognized_and_left_canonical() {
        assert!(is_date_string("2025-03-01"));
        assert!(!is_date_string("2025-3-1"));
        assert!(!is_date_string("2025-13-01"));
        assert!(!is_date_string("not-a-date"));
        assert!(!is_date_string("2025-03-01T09:00:00"));
    }

    #[test]
    fn utc_suffix_is_rewritten_to_explicit_offset() {
        let value = normalize_dates(json!({"at": "2025-03-01T09:15:30Z"}));
        assert_eq!(value, json!({"at": "2025-03-01T09:15:30+00:00"}));
    }

    #[test]
    fn space_separator_is_rewritten_to_t() {
        let value = normalize_dates(json!("2025-03-01 09:15:30+03:00"));
        assert_eq!(value, json!("2025-03-01T09:15:30+03:00"));
    }

    #[test]
    fn naive_timestamps_stay_naive() {
        let value = normalize_dates(json!("2025-03-01 09:15:30"));
        assert_eq!(value, json!("2025-03-01T09:15:30"));
    }

    #[test]
    fn nested_structures_are_walked() {
        let value = normalize_dates(json!({
            "employee_id": 4,
            "offday_dates": ["2025-03-01", "2025-03-02"],
            "meta": {"submitted": "2025-02-20T08:00:00Z", "note": "monthly plan"}
        }));

        assert_eq!(
            value,
            json!({
                "employee_id": 4,
                "offday_dates": ["2025-03-01", "2025-03-02"],
                "meta": {"submitted": "2025-02-20T08:00:00+00:00", "note": "monthly plan"}
            })
        );
    }

    #[test]
    fn non_date_strings_are_untouched() {
        let value = normalize_dates(json!({"remarks": "review 2025 budget", "phone": "555-0100"}));
        assert_eq!(value, json!({"remarks": "review 2025 budget", "phone": "555-0100"}));
    }

    #[test]
    fn multibyte_text_near_the_date_width_is_untouched() {
        let value = normalize_dates(json!({
            "description": "123456789é extra text",
            "remarks": "congé annuel prévu",
            "short": "café"
        }));
        assert_eq!(
            value,
            json!({
                "description": "123456789é extra text",
                "remarks": "congé annuel prévu",
                "short": "café"
            })
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let first = normalize_dates(json!({
            "effective_date": "2025-04-15",
            "recorded": "2025-04-15 10:30:00Z",
            "window": ["2025-04-01T00:00:00+00:00", "2025-04-30"]
        }));
        let second = normalize_dates(first.clone());
        assert_eq!(first, second);
    }
}
