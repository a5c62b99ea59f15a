//! Lenient serde helpers for request bodies posted from HTML forms.
//!
//! Browser forms send every field as a string, so numeric and boolean
//! fields accept either a JSON scalar of the right type or its text form.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => parse_flag(s),
        _ => None,
    }
}

/// Parse a textual on/off flag (`true/false`, `1/0`, `yes/no`, `on/off`).
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Number or numeric string; `null` and a missing field become `0.0`.
pub fn f64_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0.0),
        Some(value) => {
            to_f64(&value).ok_or_else(|| D::Error::custom(format!("expected a number, got {}", value)))
        }
    }
}

/// Optional port as number or string.
pub fn opt_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => to_f64(&value)
            .filter(|n| n.fract() == 0.0 && *n >= 1.0 && *n <= f64::from(u16::MAX))
            .map(|n| Some(n as u16))
            .ok_or_else(|| D::Error::custom(format!("invalid port: {}", value))),
    }
}

/// Optional flag as bool, 0/1 or text.
pub fn opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => to_bool(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid flag: {}", value))),
    }
}
