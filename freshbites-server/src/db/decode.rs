//! Decoding arbitrary result rows into ordered JSON objects
//!
//! Caller SQL can return any column type, so decoding dispatches on the
//! type name the server reports. Unprepared statements return text-format
//! values and bound statements return binary ones; both must produce the
//! same JSON. Types without a native JSON shape are rendered the way the
//! server prints them, and binary values of those types are formatted to
//! match.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use freshbites_core::Row;
use serde_json::{Number, Value};
use sqlx::postgres::types::{PgInterval, PgTimeTz};
use sqlx::postgres::{PgRow, PgTypeKind, PgValueFormat, PgValueRef};
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::types::{BigDecimal, JsonValue, Uuid};
use sqlx::{Column, Decode, Postgres, Row as _, Type, TypeInfo, ValueRef};

/// Significant digits an `f64` carries through a decimal round trip.
const F64_EXACT_DIGITS: usize = 15;

/// Convert one row to a column-name keyed JSON object in select order.
///
/// Duplicate column names keep the last value, as a JSON object would.
pub fn row_to_json(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), column_value(row, column.ordinal())))
        .collect()
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    match row.try_get::<Option<T>, _>(index) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(index, error = %e, "Column decode failed");
            None
        }
    }
}

fn significant_digits(text: &str) -> usize {
    let mantissa = text.split(|c| c == 'e' || c == 'E').next().unwrap_or(text);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').trim_end_matches('0').len()
}

/// Decimal text as a JSON number when that is lossless, else as a string.
fn number(text: &str) -> Value {
    match Number::from_str(text) {
        Ok(n) if !n.is_f64() || significant_digits(text) <= F64_EXACT_DIGITS => Value::Number(n),
        _ => Value::String(text.to_string()),
    }
}

fn float(value: Option<f64>) -> Value {
    value
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn array<T>(values: Option<Vec<Option<T>>>) -> Value
where
    T: Into<Value>,
{
    match values {
        Some(items) => Value::Array(
            items
                .into_iter()
                .map(|item| item.map(Into::into).unwrap_or(Value::Null))
                .collect(),
        ),
        None => Value::Null,
    }
}

/// Server text for text-format values, `binary` for binary ones.
fn textual_or(raw: &PgValueRef<'_>, binary: impl FnOnce() -> Option<String>) -> Value {
    let text = if raw.format() == PgValueFormat::Text {
        raw.as_str().ok().map(str::to_string)
    } else {
        binary()
    };
    text.map(Value::String).unwrap_or(Value::Null)
}

/// `NaN` and the infinities, read from the sign word of a binary NUMERIC
/// (`ndigits`, `weight`, `sign`, `dscale`, each 16 bits).
fn numeric_special(bytes: &[u8]) -> Option<&'static str> {
    let sign = u16::from_be_bytes([*bytes.get(4)?, *bytes.get(5)?]);
    match sign {
        0xC000 => Some("NaN"),
        0xD000 => Some("Infinity"),
        0xF000 => Some("-Infinity"),
        _ => None,
    }
}

fn numeric(row: &PgRow, index: usize, raw: &PgValueRef<'_>) -> Value {
    if raw.format() == PgValueFormat::Text {
        return raw.as_str().map(number).unwrap_or(Value::Null);
    }
    match row.try_get::<BigDecimal, _>(index) {
        Ok(d) => number(&d.to_string()),
        Err(_) => raw
            .as_bytes()
            .ok()
            .and_then(numeric_special)
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null),
    }
}

fn fraction(micros: u64) -> String {
    if micros == 0 {
        String::new()
    } else {
        format!(".{:06}", micros).trim_end_matches('0').to_string()
    }
}

fn push_interval_part(out: &mut String, value: i64, unit: &str, is_zero: &mut bool, is_before: &mut bool) {
    if value == 0 {
        return;
    }
    if !*is_zero {
        out.push(' ');
    }
    if *is_before && value > 0 {
        out.push('+');
    }
    let _ = write!(out, "{} {}{}", value, unit, if value == 1 { "" } else { "s" });
    *is_before = value < 0;
    *is_zero = false;
}

/// Interval in the server's default (`postgres`) output style.
pub fn interval_text(months: i32, days: i32, micros: i64) -> String {
    let mut out = String::new();
    let (mut is_zero, mut is_before) = (true, false);
    push_interval_part(&mut out, i64::from(months / 12), "year", &mut is_zero, &mut is_before);
    push_interval_part(&mut out, i64::from(months % 12), "mon", &mut is_zero, &mut is_before);
    push_interval_part(&mut out, i64::from(days), "day", &mut is_zero, &mut is_before);

    if is_zero || micros != 0 {
        let abs = micros.unsigned_abs();
        if !is_zero {
            out.push(' ');
        }
        if micros < 0 {
            out.push('-');
        } else if is_before {
            out.push('+');
        }
        let _ = write!(
            out,
            "{:02}:{:02}:{:02}{}",
            abs / 3_600_000_000,
            abs / 60_000_000 % 60,
            abs / 1_000_000 % 60,
            fraction(abs % 1_000_000)
        );
    }
    out
}

fn time_text(time: NaiveTime) -> String {
    format!(
        "{:02}:{:02}:{:02}{}",
        time.hour(),
        time.minute(),
        time.second(),
        fraction(u64::from(time.nanosecond() / 1_000))
    )
}

/// `+HH`, widened to `+HH:MM[:SS]` only when needed.
fn offset_text(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let abs = secs.unsigned_abs();
    let mut out = format!("{}{:02}", if secs < 0 { '-' } else { '+' }, abs / 3600);
    if abs % 3600 != 0 {
        let _ = write!(out, ":{:02}", abs / 60 % 60);
    }
    if abs % 60 != 0 {
        let _ = write!(out, ":{:02}", abs % 60);
    }
    out
}

fn bytea_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// `inet` drops a full-length mask, `cidr` always shows it.
fn inet_text(network: IpNetwork, always_mask: bool) -> String {
    let full = match network {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    };
    if !always_mask && network.prefix() == full {
        network.ip().to_string()
    } else {
        format!("{}/{}", network.ip(), network.prefix())
    }
}

fn column_value(row: &PgRow, index: usize) -> Value {
    let raw = match row.try_get_raw(index) {
        Ok(raw) => raw,
        Err(_) => return Value::Null,
    };
    if raw.is_null() {
        return Value::Null;
    }
    let type_info = raw.type_info().into_owned();

    match type_info.name() {
        "BOOL" => get::<bool>(row, index).map(Value::Bool).unwrap_or(Value::Null),
        "INT2" => get::<i16>(row, index).map(Value::from).unwrap_or(Value::Null),
        "INT4" => get::<i32>(row, index).map(Value::from).unwrap_or(Value::Null),
        "INT8" => get::<i64>(row, index).map(Value::from).unwrap_or(Value::Null),
        "FLOAT4" => float(get::<f32>(row, index).map(f64::from)),
        "FLOAT8" => float(get::<f64>(row, index)),
        "NUMERIC" => numeric(row, index, &raw),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
            get::<String>(row, index).map(Value::String).unwrap_or(Value::Null)
        }
        "JSON" | "JSONB" => get::<JsonValue>(row, index).unwrap_or(Value::Null),
        "UUID" => get::<Uuid>(row, index)
            .map(|u| Value::String(u.to_string()))
            .unwrap_or(Value::Null),
        "DATE" => get::<NaiveDate>(row, index)
            .map(|d| Value::String(d.to_string()))
            .unwrap_or(Value::Null),
        "TIME" => get::<NaiveTime>(row, index)
            .map(|t| Value::String(time_text(t)))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index)
            .map(|t| Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index)
            .map(|t| Value::String(t.to_rfc3339()))
            .unwrap_or(Value::Null),
        "TIMETZ" => textual_or(&raw, || {
            get::<PgTimeTz<NaiveTime, FixedOffset>>(row, index)
                .map(|t| format!("{}{}", time_text(t.time), offset_text(t.offset)))
        }),
        "INTERVAL" => textual_or(&raw, || {
            get::<PgInterval>(row, index).map(|iv| interval_text(iv.months, iv.days, iv.microseconds))
        }),
        "BYTEA" => textual_or(&raw, || get::<Vec<u8>>(row, index).map(|b| bytea_text(&b))),
        "INET" => textual_or(&raw, || get::<IpNetwork>(row, index).map(|n| inet_text(n, false))),
        "CIDR" => textual_or(&raw, || get::<IpNetwork>(row, index).map(|n| inet_text(n, true))),
        "BOOL[]" => array(get::<Vec<Option<bool>>>(row, index)),
        "INT2[]" => array(get::<Vec<Option<i16>>>(row, index)),
        "INT4[]" => array(get::<Vec<Option<i32>>>(row, index)),
        "INT8[]" => array(get::<Vec<Option<i64>>>(row, index)),
        "FLOAT4[]" => array(get::<Vec<Option<f32>>>(row, index)),
        "FLOAT8[]" => array(get::<Vec<Option<f64>>>(row, index)),
        "NUMERIC[]" => match get::<Vec<Option<BigDecimal>>>(row, index) {
            Some(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| item.map(|d| number(&d.to_string())).unwrap_or(Value::Null))
                    .collect(),
            ),
            None => Value::Null,
        },
        "TEXT[]" | "VARCHAR[]" => array(get::<Vec<Option<String>>>(row, index)),
        other => {
            // Text-format values and enum labels are readable as plain text
            let textual = raw.format() == PgValueFormat::Text
                || matches!(type_info.kind(), PgTypeKind::Enum(_));
            if textual {
                raw.as_str()
                    .map(|s| Value::String(s.to_string()))
                    .unwrap_or(Value::Null)
            } else {
                tracing::debug!(column_type = other, "No JSON mapping for binary column");
                Value::Null
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_text_becomes_json_number() {
        assert_eq!(number("12.50"), json!(12.5));
        assert_eq!(number("-3"), json!(-3));
        assert_eq!(number("NaN"), Value::String("NaN".into()));
    }

    #[test]
    fn oversized_numeric_keeps_every_digit() {
        let big = "123456789012345678901234567890123";
        assert_eq!(number(big), Value::String(big.into()));
        assert_eq!(
            number("0.12345678901234567890"),
            Value::String("0.12345678901234567890".into())
        );
        // Trailing zeros are not precision
        assert_eq!(number("10000000000000000000000000000"), json!(1e28));
        assert_eq!(number("123456789012345"), json!(123456789012345i64));
    }

    #[test]
    fn special_numerics_from_sign_word() {
        assert_eq!(numeric_special(&[0, 0, 0, 0, 0xC0, 0, 0, 0]), Some("NaN"));
        assert_eq!(numeric_special(&[0, 0, 0, 0, 0xD0, 0, 0, 0]), Some("Infinity"));
        assert_eq!(numeric_special(&[0, 0, 0, 0, 0xF0, 0, 0, 0]), Some("-Infinity"));
        assert_eq!(numeric_special(&[0, 1, 0, 0, 0x40, 0, 0, 0]), None);
        assert_eq!(numeric_special(&[0, 0]), None);
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(float(Some(f64::INFINITY)), Value::Null);
        assert_eq!(float(Some(1.5)), json!(1.5));
        assert_eq!(float(None), Value::Null);
    }

    #[test]
    fn arrays_keep_nulls() {
        let value = array(Some(vec![Some(1i64), None, Some(3)]));
        assert_eq!(value, json!([1, null, 3]));
        assert_eq!(array::<i64>(None), Value::Null);
    }

    #[test]
    fn intervals_print_like_the_server() {
        assert_eq!(interval_text(0, 1, 0), "1 day");
        assert_eq!(interval_text(0, 0, 0), "00:00:00");
        assert_eq!(interval_text(14, 3, 14_706_500_000), "1 year 2 mons 3 days 04:05:06.5");
        assert_eq!(interval_text(0, -1, 0), "-1 days");
        assert_eq!(interval_text(0, -1, 3_600_000_000), "-1 days +01:00:00");
        assert_eq!(interval_text(0, 0, -90_000_000), "-00:01:30");
    }

    #[test]
    fn times_with_zone_print_like_the_server() {
        let time = NaiveTime::from_hms_micro_opt(18, 42, 15, 120_000).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let west = FixedOffset::west_opt(8 * 3600).unwrap();

        assert_eq!(format!("{}{}", time_text(time), offset_text(utc)), "18:42:15.12+00");
        assert_eq!(offset_text(ist), "+05:30");
        assert_eq!(offset_text(west), "-08");
    }

    #[test]
    fn bytea_and_inet_print_like_the_server() {
        assert_eq!(bytea_text(&[0x01, 0xab]), "\\x01ab");
        assert_eq!(bytea_text(&[]), "\\x");

        let host: IpNetwork = "192.168.0.1/32".parse().unwrap();
        let net: IpNetwork = "10.0.0.0/8".parse().unwrap();
        assert_eq!(inet_text(host, false), "192.168.0.1");
        assert_eq!(inet_text(host, true), "192.168.0.1/32");
        assert_eq!(inet_text(net, false), "10.0.0.0/8");
    }
}
