//! # strata-dialects
//!
//! Dialect engines that turn dialect-neutral [`Operation`]s into SQL.
//!
//! The [`Dialect`] trait defines one method per operation kind. Each returns
//! `Vec<String>` because some operations (especially on `SQLite`) need several
//! statements. Two engines are provided:
//!
//! - [`MySqlDialect`] alters tables in place.
//! - [`SqliteDialect`] rebuilds a table through a temporary copy for every
//!   column- or constraint-level change.
//!
//! [`script::render_script`] walks a whole operation list and makes sure a
//! chain of `SQLite` changes to one table rebuilds it only once.

pub mod mysql;
pub mod script;
pub mod sqlite;

use std::fmt;
use std::sync::Arc;

use strata_core::settings::Engine;
use strata_core::{StrataError, StrataResult};
use strata_schema::{
    Column, ColumnDefault, ForeignKey, Index, IndexKind, Operation, SchemaState, Table, Value,
};

pub use mysql::MySqlDialect;
pub use script::render_script;
pub use sqlite::SqliteDialect;

/// Generates SQL for schema operations in one engine's dialect.
///
/// Alteration methods receive the table as it is *before* the operation.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// The engine this dialect targets.
    fn engine(&self) -> Engine;

    /// Quotes an identifier.
    fn quote(&self, ident: &str) -> String;

    /// Renders a value as an inline literal.
    fn literal(&self, value: &Value) -> String {
        value.to_sql_literal()
    }

    /// The `DEFAULT` expression of a column, if it renders one.
    fn default_sql(&self, column: &Column) -> Option<String> {
        match &column.default {
            Some(ColumnDefault::Literal(value)) => Some(self.literal(value)),
            _ => column.default_sql(),
        }
    }

    /// The SQL type of a column, e.g. `VARCHAR(255)`.
    fn column_type_sql(&self, column: &Column) -> String;

    /// A full column definition: quoted name, type, and modifiers.
    fn column_sql(&self, column: &Column) -> String;

    /// The `CREATE TABLE` statement alone, without any secondary indexes.
    fn table_sql(&self, table: &Table) -> String;

    /// Generates DDL to create a table together with its indexes.
    fn create_table(&self, table: &Table) -> StrataResult<Vec<String>>;

    /// Generates `DROP TABLE` DDL.
    fn drop_table(&self, table: &str, if_exists: bool) -> StrataResult<Vec<String>>;

    /// Generates DDL to rename a table and its dependent objects.
    fn rename_table(&self, table: &Table, to: &str) -> StrataResult<Vec<String>>;

    fn add_column(&self, table: &Table, column: &Column) -> StrataResult<Vec<String>>;

    fn drop_column(&self, table: &Table, column: &str) -> StrataResult<Vec<String>>;

    fn modify_column(&self, table: &Table, column: &Column) -> StrataResult<Vec<String>>;

    fn change_column(&self, table: &Table, from: &str, column: &Column)
        -> StrataResult<Vec<String>>;

    /// Generates DDL for an index of any kind, including the primary key.
    fn add_index(&self, table: &Table, index: &Index) -> StrataResult<Vec<String>>;

    fn drop_index(&self, table: &Table, index: &Index) -> StrataResult<Vec<String>>;

    fn add_foreign_key(&self, table: &Table, foreign_key: &ForeignKey)
        -> StrataResult<Vec<String>>;

    fn drop_foreign_key(&self, table: &Table, field: &str) -> StrataResult<Vec<String>>;

    fn raw_query(&self, sql: &str) -> StrataResult<Vec<String>> {
        Ok(vec![sql.to_string()])
    }

    /// Returns the column as this engine will actually store it. The diff
    /// engine compares normalized columns so that differences the engine
    /// cannot represent never produce a change.
    fn normalize_column(&self, column: &Column) -> Column {
        column.clone()
    }

    /// Returns `true` if this engine applies `op` by rebuilding the table.
    fn rebuilds(&self, _op: &Operation) -> bool {
        false
    }

    /// Rebuilds `before` into the shape of `after` via a temporary copy.
    ///
    /// `sources` pairs each column of `after` with the column of `before` its
    /// data is copied from.
    fn rebuild_table(
        &self,
        before: &Table,
        _after: &Table,
        _sources: &[(String, String)],
    ) -> StrataResult<Vec<String>> {
        Err(StrataError::UnsupportedOperation {
            dialect: self.engine().to_string(),
            operation: format!("rebuild table {}", before.name),
        })
    }

    /// Renders one operation against the schema as it stands before it.
    fn render(&self, op: &Operation, state: &SchemaState) -> StrataResult<Vec<String>> {
        let table = |name: &str| {
            state.table(name).ok_or_else(|| {
                StrataError::InvalidSchema(format!(
                    "cannot render '{}': table '{name}' does not exist",
                    op.describe()
                ))
            })
        };
        match op {
            Operation::CreateTable { table } => self.create_table(table),
            Operation::DropTable { table } => self.drop_table(table, false),
            Operation::DropTableIfExists { table } => self.drop_table(table, true),
            Operation::RenameTable { from, to } => self.rename_table(table(from)?, to),
            Operation::AddColumn { table: t, column } => self.add_column(table(t)?, column),
            Operation::DropColumn { table: t, column } => self.drop_column(table(t)?, column),
            Operation::ModifyColumn { table: t, column } => self.modify_column(table(t)?, column),
            Operation::ChangeColumn {
                table: t,
                from,
                column,
            } => self.change_column(table(t)?, from, column),
            Operation::AddIndex { table: t, field } => {
                self.add_index(table(t)?, &Index::new(field, IndexKind::Index))
            }
            Operation::AddUnique { table: t, field } => {
                self.add_index(table(t)?, &Index::new(field, IndexKind::Unique))
            }
            Operation::AddPrimaryKey { table: t, field } => {
                self.add_index(table(t)?, &Index::new(field, IndexKind::PrimaryKey))
            }
            Operation::DropIndex { table: t, field } => {
                self.drop_index(table(t)?, &Index::new(field, IndexKind::Index))
            }
            Operation::DropUnique { table: t, field } => {
                self.drop_index(table(t)?, &Index::new(field, IndexKind::Unique))
            }
            Operation::DropPrimaryKey { table: t, field } => {
                self.drop_index(table(t)?, &Index::new(field, IndexKind::PrimaryKey))
            }
            Operation::AddForeignKey {
                table: t,
                foreign_key,
            } => self.add_foreign_key(table(t)?, foreign_key),
            Operation::DropForeignKey { table: t, field } => {
                self.drop_foreign_key(table(t)?, field)
            }
            Operation::RawQuery { sql } => self.raw_query(sql),
        }
    }
}

/// A shared, dynamically chosen dialect.
pub type SharedDialect = Arc<dyn Dialect>;

/// Returns the dialect for an engine.
pub fn dialect_for(engine: Engine) -> SharedDialect {
    match engine {
        Engine::Sqlite => Arc::new(SqliteDialect::new()),
        Engine::Mysql => Arc::new(MySqlDialect::new()),
    }
}

/// Renders a column definition in the given dialect.
pub fn column_to_sql(dialect: &dyn Dialect, column: &Column) -> String {
    dialect.column_sql(column)
}

/// Renders a `CREATE TABLE` statement in the given dialect.
pub fn table_to_sql(dialect: &dyn Dialect, table: &Table) -> String {
    dialect.table_sql(table)
}

/// Renders a literal list of `'a', 'b'` enum options.
pub(crate) fn enum_options_sql(dialect: &dyn Dialect, column: &Column) -> String {
    column
        .enum_options()
        .iter()
        .map(|o| dialect.literal(&Value::from(o.as_str())))
        .collect::<Vec<_>>()
        .join(", ")
}
