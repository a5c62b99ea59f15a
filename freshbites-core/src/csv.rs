//! CSV serialization of query rows.
//!
//! Every field is wrapped in double quotes; quotes inside a value are
//! doubled. Rows are joined with `\n` and there is no trailing newline.

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// A decoded row: column name to JSON value, in select-list order.
pub type Row = Map<String, Value>;

/// Render `rows` as CSV, header taken from the first row's columns.
///
/// With no rows the header comes from `fallback_header`; with neither
/// there is nothing to derive a header from and an export error is
/// returned.
pub fn to_csv(rows: &[Row], fallback_header: Option<&[&str]>) -> Result<String> {
    let header: Vec<&str> = match rows.first() {
        Some(first) => first.keys().map(String::as_str).collect(),
        None => match fallback_header {
            Some(columns) => columns.to_vec(),
            None => return Err(CoreError::export("no rows to derive a CSV header from")),
        },
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(join(header.iter().map(|h| quote(h))));

    for row in rows {
        lines.push(join(header.iter().map(|column| {
            quote(&field_text(row.get(*column).unwrap_or(&Value::Null)))
        })));
    }

    Ok(lines.join("\n"))
}

fn join(fields: impl Iterator<Item = String>) -> String {
    fields.collect::<Vec<_>>().join(",")
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Text form of a JSON value inside a CSV field.
///
/// Strings are written bare, null as an empty field, everything else in
/// its JSON notation.
pub fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    #[test]
    fn header_and_rows_are_quoted() {
        let rows = vec![
            row(json!({"week": 12, "sku": "SKU003_Cheese", "dc": "Mumbai", "actual": 120.5})),
            row(json!({"week": 13, "sku": "SKU001_Snacks", "dc": "Kolkata", "actual": 60})),
        ];
        let csv = to_csv(&rows, None).unwrap();
        assert_eq!(
            csv,
            "\"week\",\"sku\",\"dc\",\"actual\"\n\
             \"12\",\"SKU003_Cheese\",\"Mumbai\",\"120.5\"\n\
             \"13\",\"SKU001_Snacks\",\"Kolkata\",\"60\""
        );
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let rows = vec![row(json!({"note": "say \"hi\", then leave"}))];
        let csv = to_csv(&rows, None).unwrap();
        assert_eq!(csv, "\"note\"\n\"say \"\"hi\"\", then leave\"");
    }

    #[test]
    fn null_becomes_empty_field() {
        let rows = vec![row(json!({"a": null, "b": true}))];
        assert_eq!(to_csv(&rows, None).unwrap(), "\"a\",\"b\"\n\"\",\"true\"");
    }

    #[test]
    fn empty_rows_use_fallback_header() {
        let csv = to_csv(&[], Some(&["week", "sku"])).unwrap();
        assert_eq!(csv, "\"week\",\"sku\"");
    }

    #[test]
    fn empty_rows_without_fallback_is_export_error() {
        let err = to_csv(&[], None).unwrap_err();
        assert!(matches!(err, CoreError::Export { .. }));
    }
}
