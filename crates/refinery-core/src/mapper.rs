//! Field Mapper — pure per-record value normalization
//!
//! Every function here takes one JSON record (or sub-object) and produces a
//! canonical scalar value for a target column. Nothing in this module touches
//! the store or the filesystem.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{RefineryError, Result};
use crate::schema::SchemaProfile;

/// Outcome of a lenient mapping: either clean, or recovered with a fallback.
///
/// Callers that receive a `Fallback` log the reason at warning level and
/// continue; a fatal condition is the outer [`Result`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapped<T> {
    Clean(T),
    Fallback { value: T, reason: String },
}

impl<T> Mapped<T> {
    /// Unwrap to the mapped value, discarding fallback information
    pub fn into_value(self) -> T {
        match self {
            Mapped::Clean(value) => value,
            Mapped::Fallback { value, .. } => value,
        }
    }

    /// The fallback reason, if this mapping recovered from bad input
    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Mapped::Clean(_) => None,
            Mapped::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Parse an event timestamp leniently.
///
/// Accepts RFC 3339 with or without a trailing `Z`, naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` (assumed UTC), the space-separated variant,
/// and a bare date. A missing value maps to the current time; an unparsable
/// one maps to the current time as a `Fallback` carrying the reason. Bad
/// timestamps never abort ingestion.
pub fn parse_timestamp(raw: Option<&Value>) -> Mapped<DateTime<Utc>> {
    let Some(value) = raw else {
        return Mapped::Clean(Utc::now());
    };
    let Some(text) = value.as_str() else {
        return Mapped::Fallback {
            value: Utc::now(),
            reason: format!("timestamp is not a string: {}", value),
        };
    };
    match parse_iso8601(text) {
        Some(instant) => Mapped::Clean(instant),
        None => Mapped::Fallback {
            value: Utc::now(),
            reason: format!("unparsable timestamp '{}'", text),
        },
    }
}

fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

/// Map a required text field according to the active schema profile.
///
/// `Rich` substitutes the given default for a missing or null field; `Strict`
/// fails with a validation error naming the field.
pub fn required_text(
    record: &Value,
    field: &str,
    profile: SchemaProfile,
    default: &str,
) -> Result<String> {
    match record.get(field) {
        Some(value) if !value.is_null() => Ok(render_text(value)),
        _ => match profile {
            SchemaProfile::Rich => Ok(default.to_string()),
            SchemaProfile::Strict => Err(RefineryError::Validation {
                field: field.to_string(),
            }),
        },
    }
}

/// Map an optional text field; absent and null are both `None`
pub fn optional_text(record: &Value, field: &str) -> Option<String> {
    record.get(field).filter(|v| !v.is_null()).map(render_text)
}

/// Serialize a nested structured value to canonical JSON text.
///
/// The structure is stored whole or not at all; there is no partial
/// serialization.
pub fn json_blob(record: &Value, field: &str) -> Option<String> {
    match record.get(field) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.to_string()),
    }
}

pub fn optional_i64(record: &Value, field: &str) -> Option<i64> {
    record.get(field).and_then(Value::as_i64)
}

pub fn optional_f64(record: &Value, field: &str) -> Option<f64> {
    record.get(field).and_then(Value::as_f64)
}

pub fn optional_bool(record: &Value, field: &str) -> Option<bool> {
    record.get(field).and_then(Value::as_bool)
}

fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
