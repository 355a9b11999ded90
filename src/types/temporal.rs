//! `datetime`.
//!
//! Canonical values are UTC instants. Naive input (no offset) is read as UTC.

use super::{range_bounds, Restriction, SqlType, TypeDefinition, TypeError, TypeFamily};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeType;

impl TypeDefinition for DateTimeType {
    fn name(&self) -> &'static str {
        "datetime"
    }

    fn family(&self) -> TypeFamily {
        TypeFamily::Temporal
    }

    fn sql_type(&self) -> SqlType {
        SqlType::TimestampTz
    }

    fn parse(&self, text: &str) -> Result<Value, TypeError> {
        let trimmed = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Value::DateTime(dt.with_timezone(&Utc)));
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Value::DateTime(naive.and_utc()));
            }
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Value::DateTime(naive.and_utc()))
            .ok_or_else(|| TypeError::invalid(self.name(), text, "expected RFC 3339 or YYYY-MM-DD[ HH:MM:SS]"))
    }

    fn to_internal(&self, value: &Value) -> Result<Value, TypeError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
            Value::String(s) => self.parse(s),
            Value::Int(secs) => DateTime::from_timestamp(*secs, 0)
                .map(Value::DateTime)
                .ok_or_else(|| TypeError::invalid(self.name(), secs, "timestamp out of range")),
            other => Err(TypeError::invalid(self.name(), other, format!("cannot convert {}", other.kind()))),
        }
    }

    fn to_external(&self, value: &Value) -> JsonValue {
        match value {
            Value::Null => JsonValue::Null,
            Value::DateTime(dt) => JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            other => JsonValue::String(other.to_string()),
        }
    }

    fn range(&self, min: Option<&JsonValue>, max: Option<&JsonValue>) -> Result<Restriction, TypeError> {
        range_bounds(self, min, max)
    }
}
