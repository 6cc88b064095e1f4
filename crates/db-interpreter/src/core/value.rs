//! SQL value types and result rows.
//!
//! Drivers decode their native rows into [`Row`], an ordered list of
//! `name -> SqlValue` pairs. Catalog mapping uses the lenient accessors
//! (`get_str`, `get_i64`, `get_bool`) since engines disagree on the types
//! they return for the same information-schema column.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// SQL value enum for type-safe row handling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Timestamp without timezone.
    DateTime(NaiveDateTime),
    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),
}

impl SqlValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Render as plain text, `None` for NULL and binary data.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null | SqlValue::Bytes(_) => None,
            SqlValue::Bool(v) => Some(if *v { "1".into() } else { "0".into() }),
            SqlValue::I32(v) => Some(v.to_string()),
            SqlValue::I64(v) => Some(v.to_string()),
            SqlValue::F32(v) => Some(v.to_string()),
            SqlValue::F64(v) => Some(v.to_string()),
            SqlValue::Decimal(v) => Some(v.to_string()),
            SqlValue::Text(v) => Some(v.clone()),
            SqlValue::Uuid(v) => Some(v.to_string()),
            SqlValue::Date(v) => Some(v.format("%Y-%m-%d").to_string()),
            SqlValue::Time(v) => Some(v.format("%H:%M:%S%.f").to_string()),
            SqlValue::DateTime(v) => Some(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            SqlValue::DateTimeOffset(v) => Some(v.format("%Y-%m-%d %H:%M:%S%.f %:z").to_string()),
        }
    }

    /// Interpret as an integer where the value allows it.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Bool(v) => Some(i64::from(*v)),
            SqlValue::I32(v) => Some(i64::from(*v)),
            SqlValue::I64(v) => Some(*v),
            SqlValue::Decimal(v) => v.trunc().to_string().parse().ok(),
            SqlValue::Text(v) => v.trim().parse().ok(),
            SqlValue::Bytes(v) => std::str::from_utf8(v).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret as a flag: non-zero numbers, `YES`, `Y`, `TRUE`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(v) => Some(*v),
            SqlValue::Text(v) => {
                let v = v.trim();
                if let Ok(n) = v.parse::<i64>() {
                    return Some(n != 0);
                }
                Some(
                    v.eq_ignore_ascii_case("yes")
                        || v.eq_ignore_ascii_case("y")
                        || v.eq_ignore_ascii_case("true"),
                )
            }
            other => other.as_i64().map(|n| n != 0),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// One result row: column names paired with values, in select order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column (builder style).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push(name.into());
        self.values.push(value.into());
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a value by column name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .map(|i| &self.values[i])
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            SqlValue::Bytes(b) => String::from_utf8(b.clone()).ok(),
            other => other.as_text(),
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(SqlValue::as_i64)
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(SqlValue::as_bool).unwrap_or(false)
    }
}

/// A batch of rows bound for one destination table.
#[derive(Debug, Clone, Default)]
pub struct DataBatch {
    /// Destination owner (schema).
    pub owner: String,
    /// Destination table.
    pub table: String,
    /// Column names in value order.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl DataBatch {
    pub fn new(owner: impl Into<String>, table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            owner: owner.into(),
            table: table.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a batch from query rows, keeping the given column order.
    pub fn from_rows(
        owner: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Row>,
    ) -> Self {
        let values = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or(SqlValue::Null))
                    .collect()
            })
            .collect();
        Self {
            owner: owner.into(),
            table: table.into(),
            columns,
            rows: values,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_is_case_insensitive() {
        let row = Row::new().with("TABLE_NAME", "orders").with("Ordinal", 3i64);
        assert_eq!(row.get_str("table_name").as_deref(), Some("orders"));
        assert_eq!(row.get_i32("ORDINAL"), Some(3));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_lenient_bool() {
        let row = Row::new()
            .with("a", "YES")
            .with("b", "NO")
            .with("c", 1i32)
            .with("d", "0")
            .with("e", SqlValue::Null);
        assert!(row.get_bool("a"));
        assert!(!row.get_bool("b"));
        assert!(row.get_bool("c"));
        assert!(!row.get_bool("d"));
        assert!(!row.get_bool("e"));
    }

    #[test]
    fn test_numeric_text_and_bytes() {
        let row = Row::new()
            .with("len", "600")
            .with("raw", SqlValue::Bytes(b"42".to_vec()))
            .with("dec", Decimal::new(1250, 2));
        assert_eq!(row.get_i64("len"), Some(600));
        assert_eq!(row.get_i64("raw"), Some(42));
        assert_eq!(row.get_i64("dec"), Some(12));
        assert_eq!(row.get_str("raw").as_deref(), Some("42"));
    }

    #[test]
    fn test_batch_from_rows_reorders_columns() {
        let rows = vec![Row::new().with("b", 2i32).with("a", 1i32)];
        let batch = DataBatch::from_rows("s", "t", vec!["a".into(), "b".into()], rows);
        assert_eq!(batch.rows[0], vec![SqlValue::I32(1), SqlValue::I32(2)]);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_option_into_value() {
        let v: SqlValue = Option::<i64>::None.into();
        assert!(v.is_null());
        let v: SqlValue = Some("x").into();
        assert_eq!(v, SqlValue::Text("x".into()));
    }
}
