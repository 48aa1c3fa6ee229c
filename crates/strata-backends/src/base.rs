//! Base database backend trait.
//!
//! This module defines the [`DatabaseBackend`] trait that every driver
//! implements. It is the narrow surface the migration runner talks to:
//! plain statement execution, queries for the history table, explicit
//! transaction control, and live schema introspection.

use strata_core::settings::Engine;
use strata_core::{StrataError, StrataResult};
use strata_schema::{Column, ColumnDefault, ColumnType, Table, Value};

use crate::row::Row;

/// The core trait for database backends.
///
/// All methods are async because database operations are I/O-bound. Backends
/// built on synchronous drivers (like `rusqlite`) run their work in
/// `spawn_blocking` to keep the async interface.
///
/// A backend is one session: `begin`, the statements that follow, and
/// `commit`/`rollback` all run on the same connection.
#[async_trait::async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Returns the vendor name ("sqlite", "mysql").
    fn vendor(&self) -> &str;

    /// Returns the engine, used to pick the matching dialect.
    fn engine(&self) -> Engine;

    /// Executes a SQL statement that does not return rows.
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> StrataResult<u64>;

    /// Executes a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> StrataResult<Vec<Row>>;

    /// Executes a SQL query that must return exactly one row.
    async fn query_one(&self, sql: &str, params: &[Value]) -> StrataResult<Row> {
        let mut rows = self.query(sql, params).await?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            n => Err(StrataError::database(format!("Expected 1 row, got {n}"))),
        }
    }

    /// Begins a transaction.
    async fn begin(&self) -> StrataResult<()> {
        self.execute("BEGIN", &[]).await.map(|_| ())
    }

    async fn commit(&self) -> StrataResult<()> {
        self.execute("COMMIT", &[]).await.map(|_| ())
    }

    async fn rollback(&self) -> StrataResult<()> {
        self.execute("ROLLBACK", &[]).await.map(|_| ())
    }

    /// Returns `true` if `err` says the object a `DROP` targeted is already
    /// gone. The runner skips such statements instead of aborting.
    fn is_missing_object_error(&self, err: &StrataError) -> bool;

    /// Reads the live schema, skipping tables named in `exclude` and the
    /// engine's own bookkeeping tables.
    async fn introspect(&self, exclude: &[&str]) -> StrataResult<Vec<Table>>;
}

/// Builds a [`Column`] from a declared type as reported by the database.
///
/// Types that cannot be parsed fall back to `text`.
pub fn column_from_declared(name: &str, declared: &str, nullable: bool) -> Column {
    let (column_type, size, unsigned) =
        ColumnType::parse_declared(declared).unwrap_or((ColumnType::Text, None, false));
    let mut column = Column::new(name, column_type);
    column.size = size;
    column.unsigned = unsigned;
    column.nullable = nullable;
    column
}

/// Parses a column default as reported by the database.
///
/// Handles `NULL`, `CURRENT_TIMESTAMP` (with or without parentheses),
/// quoted strings, booleans, and numbers. Anything else is kept as a
/// string literal. Returns `None` for no default or a `NULL` default.
pub fn parse_default(raw: &str, column_type: ColumnType) -> Option<ColumnDefault> {
    let raw = raw.trim();
    let upper = raw.to_uppercase();
    if raw.is_empty() || upper == "NULL" {
        return None;
    }
    if upper.trim_end_matches("()") == "CURRENT_TIMESTAMP" {
        return Some(ColumnDefault::CurrentTimestamp);
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        let inner = raw[1..raw.len() - 1].replace("''", "'");
        return Some(ColumnDefault::Literal(Value::String(inner)));
    }
    let value = match upper.as_str() {
        "TRUE" => Value::Bool(true),
        "FALSE" => Value::Bool(false),
        _ if column_type == ColumnType::Boolean => match raw {
            "1" => Value::Bool(true),
            "0" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        _ if column_type.is_integer() => raw
            .parse()
            .map_or_else(|_| Value::String(raw.to_string()), Value::Int),
        _ if column_type.is_numeric() => raw
            .parse()
            .map_or_else(|_| Value::String(raw.to_string()), Value::Float),
        _ => Value::String(raw.to_string()),
    };
    Some(ColumnDefault::Literal(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_schema::ColumnSize;

    #[test]
    fn test_column_from_declared() {
        let c = column_from_declared("email", "varchar(255)", true);
        assert_eq!(c.column_type, ColumnType::Varchar);
        assert_eq!(c.size, Some(ColumnSize::Length(255)));
        assert!(c.nullable);

        let c = column_from_declared("user_id", "bigint(20) unsigned", false);
        assert_eq!(c.column_type, ColumnType::BigInt);
        assert!(c.unsigned);
        assert!(!c.nullable);
    }

    #[test]
    fn test_column_from_unknown_type() {
        let c = column_from_declared("geom", "GEOMETRY", false);
        assert_eq!(c.column_type, ColumnType::Text);
    }

    #[test]
    fn test_parse_default() {
        assert_eq!(parse_default("NULL", ColumnType::Int), None);
        assert_eq!(
            parse_default("CURRENT_TIMESTAMP", ColumnType::Timestamp),
            Some(ColumnDefault::CurrentTimestamp)
        );
        assert_eq!(
            parse_default("current_timestamp()", ColumnType::DateTime),
            Some(ColumnDefault::CurrentTimestamp)
        );
        assert_eq!(
            parse_default("'it''s'", ColumnType::Varchar),
            Some(ColumnDefault::Literal(Value::from("it's")))
        );
        assert_eq!(
            parse_default("0", ColumnType::Int),
            Some(ColumnDefault::Literal(Value::Int(0)))
        );
        assert_eq!(
            parse_default("1", ColumnType::Boolean),
            Some(ColumnDefault::Literal(Value::Bool(true)))
        );
        assert_eq!(
            parse_default("draft", ColumnType::Enum),
            Some(ColumnDefault::Literal(Value::from("draft")))
        );
    }
}
