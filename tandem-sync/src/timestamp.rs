//! `last_updated` normalization.
//!
//! Raw timestamp values arrive as loosely-typed cells. Normalization yields
//! either a timezone-naive instant or "absent":
//! - null / missing / blank text → absent
//! - text matching [`TIMESTAMP_FORMAT`] exactly → parsed instant
//! - any other text → absent (parse failure; callers log it)
//! - numbers → absent (not orderable as an instant)
//!
//! Offset-bearing instants are never converted: [`strip_offset`] keeps the
//! wall-clock fields and discards the offset.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

use tandem_core::FieldValue;

/// The only accepted textual timestamp pattern.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Normalize a raw `last_updated` cell into a naive instant, or absent.
pub fn normalize(value: Option<&FieldValue>) -> Option<NaiveDateTime> {
    match value? {
        FieldValue::Text(raw) => parse_text(raw),
        FieldValue::Number(_) | FieldValue::Null => None,
    }
}

/// Parse text against [`TIMESTAMP_FORMAT`]. Blank input is absent, not a
/// parse failure.
pub fn parse_text(raw: &str) -> Option<NaiveDateTime> {
    if raw.trim().is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}

/// True when the cell held non-blank text that failed to parse — the case
/// worth a warning, as opposed to a merely missing value.
pub fn is_malformed(value: Option<&FieldValue>) -> bool {
    match value {
        Some(FieldValue::Text(raw)) => !raw.trim().is_empty() && parse_text(raw).is_none(),
        Some(FieldValue::Number(_)) => true,
        _ => false,
    }
}

/// Drop an instant's offset, keeping the wall-clock fields unchanged.
pub fn strip_offset(instant: DateTime<FixedOffset>) -> NaiveDateTime {
    instant.naive_local()
}

/// Render a naive instant in [`TIMESTAMP_FORMAT`].
pub fn format_naive(instant: NaiveDateTime) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}
