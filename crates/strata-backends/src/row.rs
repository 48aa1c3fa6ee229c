//! Result rows returned by [`DatabaseBackend::query`](crate::DatabaseBackend::query).

use chrono::NaiveDateTime;
use strata_core::{StrataError, StrataResult};
use strata_schema::Value;

/// A database row: column names and their values.
///
/// `Row` provides typed access via [`get`](Row::get).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from column names and values.
    ///
    /// Surplus names or values beyond the shorter of the two are dropped.
    pub fn new(mut columns: Vec<String>, mut values: Vec<Value>) -> Self {
        let len = columns.len().min(values.len());
        columns.truncate(len);
        values.truncate(len);
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the raw values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a typed value by column name. Column names match
    /// case-insensitively because `information_schema` reports them in
    /// upper case on some servers.
    pub fn get<T: FromValue>(&self, column: &str) -> StrataResult<T> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .ok_or_else(|| StrataError::database(format!("Column '{column}' not found in row")))?;
        T::from_value(&self.values[idx])
    }

    /// Gets a typed value by column position.
    pub fn get_by_index<T: FromValue>(&self, idx: usize) -> StrataResult<T> {
        let value = self.values.get(idx).ok_or_else(|| {
            StrataError::database(format!(
                "Column index {idx} out of range (row has {} columns)",
                self.values.len()
            ))
        })?;
        T::from_value(value)
    }
}

/// Conversion from a [`Value`] into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> StrataResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> StrataError {
    StrataError::database(format!("Expected {expected}, got {value:?}"))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> StrataResult<Self> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> StrataResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(Self::from(*b)),
            // MySQL reports some integer metadata as text.
            Value::String(s) => s.trim().parse().map_err(|_| mismatch("Int", value)),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> StrataResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as Self),
            _ => Err(mismatch("Float", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> StrataResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            _ => Err(mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> StrataResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Bytes(b) => Ok(String::from_utf8_lossy(b).into_owned()),
            Value::DateTime(dt) => Ok(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> StrataResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::String(s) => Self::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|e| StrataError::database(format!("Invalid datetime '{s}': {e}"))),
            _ => Err(mismatch("DateTime", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> StrataResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new(
            vec!["id".into(), "name".into(), "applied_at".into()],
            vec![
                Value::Int(3),
                Value::from("0003"),
                Value::from("2026-01-02 03:04:05"),
            ],
        )
    }

    #[test]
    fn test_get_typed() {
        let row = row();
        assert_eq!(row.get::<i64>("id").unwrap(), 3);
        assert_eq!(row.get::<String>("name").unwrap(), "0003");
        let at: Option<NaiveDateTime> = row.get("applied_at").unwrap();
        assert_eq!(at.unwrap().to_string(), "2026-01-02 03:04:05");
    }

    #[test]
    fn test_get_case_insensitive() {
        assert_eq!(row().get::<String>("NAME").unwrap(), "0003");
    }

    #[test]
    fn test_missing_column() {
        assert!(row().get::<i64>("nope").is_err());
        assert!(row().get_by_index::<i64>(9).is_err());
    }

    #[test]
    fn test_option_null() {
        let row = Row::new(vec!["x".into()], vec![Value::Null]);
        assert_eq!(row.get::<Option<i64>>("x").unwrap(), None);
        assert!(row.get::<i64>("x").is_err());
    }

    #[test]
    fn test_numeric_text() {
        let row = Row::new(vec!["n".into()], vec![Value::from("42")]);
        assert_eq!(row.get::<i64>("n").unwrap(), 42);
    }
}
