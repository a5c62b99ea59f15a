//! Schema introspection over `information_schema.columns`

use freshbites_core::{ConnectionDescriptor, Row};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::error::GatewayError;
use super::gateway::QueryGateway;

/// Columns of every table in `public`, ordered by table then ordinal position.
pub const INTROSPECTION_SQL: &str = r#"
SELECT table_name, column_name, data_type, is_nullable
FROM information_schema.columns
WHERE table_schema = 'public'
ORDER BY table_name, ordinal_position
"#;

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub column: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
}

/// Table name to its columns, in the order the database returned them.
///
/// Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    tables: Vec<(String, Vec<ColumnInfo>)>,
}

impl Schema {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, columns)| columns.as_slice())
    }

    fn push(&mut self, table: String, column: ColumnInfo) {
        // Rows arrive grouped by table, so the match is almost always the last entry
        match self.tables.iter().rposition(|(name, _)| *name == table) {
            Some(i) => self.tables[i].1.push(column),
            None => self.tables.push((table, vec![column])),
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for (table, columns) in &self.tables {
            map.serialize_entry(table, columns)?;
        }
        map.end()
    }
}

fn text(row: &Row, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Group flat `(table, column, type, nullable)` rows by table.
pub fn group_columns(rows: &[Row]) -> Schema {
    let mut schema = Schema::default();
    for row in rows {
        schema.push(
            text(row, "table_name"),
            ColumnInfo {
                column: text(row, "column_name"),
                data_type: text(row, "data_type"),
                nullable: text(row, "is_nullable").eq_ignore_ascii_case("YES"),
            },
        );
    }
    schema
}

/// Introspect the database `target` points at (or the default one).
pub async fn introspect(
    gateway: &QueryGateway,
    target: Option<&ConnectionDescriptor>,
) -> Result<Schema, GatewayError> {
    let result = gateway.run(target, INTROSPECTION_SQL, &[]).await?;
    Ok(group_columns(&result.rows))
}
