//! `MySQL` dialect.
//!
//! Uses in-place `ALTER TABLE` for every change. Table creation suspends
//! foreign key checks and replaces any existing table of the same name, and
//! index creation is always preceded by a `DROP INDEX` whose "doesn't exist"
//! error (1091) the runner ignores.

use strata_core::settings::Engine;
use strata_core::StrataResult;
use strata_schema::foreign_key::foreign_key_name;
use strata_schema::{
    Column, ColumnSize, ColumnType, ForeignKey, Index, IndexKind, Table, Value, ID_COLUMN,
};

use crate::{enum_options_sql, Dialect};

/// Dialect for `MySQL` and `MariaDB`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    pub const fn new() -> Self {
        Self
    }

    fn foreign_key_sql(&self, table: &str, fk: &ForeignKey) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            self.quote(&fk.name(table)),
            self.quote(&fk.field),
            self.quote(&fk.ref_table),
            self.quote(&fk.ref_field),
            fk.on_delete.as_sql()
        )
    }

    fn alter(&self, table: &str, clause: &str) -> String {
        format!("ALTER TABLE {} {clause}", self.quote(table))
    }
}

impl Dialect for MySqlDialect {
    fn engine(&self) -> Engine {
        Engine::Mysql
    }

    fn quote(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    // Backslash is an escape character in MySQL string literals.
    fn literal(&self, value: &Value) -> String {
        match value {
            Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''")),
            other => other.to_sql_literal(),
        }
    }

    fn column_type_sql(&self, column: &Column) -> String {
        let ty = match column.column_type {
            ColumnType::TinyInt => "TINYINT".to_string(),
            ColumnType::SmallInt => "SMALLINT".to_string(),
            ColumnType::Int => "INT".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Decimal => match column.size {
                Some(ColumnSize::Precision(p, s)) => format!("DECIMAL({p}, {s})"),
                Some(ColumnSize::Length(p)) => format!("DECIMAL({p}, 0)"),
                _ => "DECIMAL(8, 2)".to_string(),
            },
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Boolean => "TINYINT(1)".to_string(),
            ColumnType::Char => format!("CHAR({})", column.length().unwrap_or(255)),
            ColumnType::Varchar => format!("VARCHAR({})", column.length().unwrap_or(255)),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::LongText => "LONGTEXT".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime => "DATETIME".to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Json => "JSON".to_string(),
            ColumnType::Blob => "BLOB".to_string(),
            ColumnType::Uuid => "CHAR(36)".to_string(),
            ColumnType::Enum => format!("ENUM({})", enum_options_sql(self, column)),
        };
        if column.unsigned && column.column_type.is_numeric() {
            format!("{ty} UNSIGNED")
        } else {
            ty
        }
    }

    fn column_sql(&self, column: &Column) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote(&column.name),
            self.column_type_sql(column)
        );
        sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = self.default_sql(column) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default);
        }
        if column.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        sql
    }

    fn table_sql(&self, table: &Table) -> String {
        let mut parts: Vec<String> = table.fields.iter().map(|c| self.column_sql(c)).collect();
        for index in &table.indexes {
            let field = self.quote(&index.field);
            parts.push(match index.kind {
                IndexKind::PrimaryKey => format!("PRIMARY KEY ({field})"),
                IndexKind::Unique => {
                    format!("UNIQUE KEY {} ({field})", self.quote(&index.name(&table.name)))
                }
                IndexKind::Index => {
                    format!("KEY {} ({field})", self.quote(&index.name(&table.name)))
                }
            });
        }
        for fk in &table.foreign_keys {
            parts.push(self.foreign_key_sql(&table.name, fk));
        }
        format!(
            "CREATE TABLE {} ({}) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            self.quote(&table.name),
            parts.join(", ")
        )
    }

    fn create_table(&self, table: &Table) -> StrataResult<Vec<String>> {
        Ok(vec![
            "SET FOREIGN_KEY_CHECKS=0".to_string(),
            format!("DROP TABLE IF EXISTS {}", self.quote(&table.name)),
            self.table_sql(table),
            "SET FOREIGN_KEY_CHECKS=1".to_string(),
        ])
    }

    fn drop_table(&self, table: &str, if_exists: bool) -> StrataResult<Vec<String>> {
        let if_exists = if if_exists { "IF EXISTS " } else { "" };
        Ok(vec![
            "SET FOREIGN_KEY_CHECKS=0".to_string(),
            format!("DROP TABLE {if_exists}{}", self.quote(table)),
            "SET FOREIGN_KEY_CHECKS=1".to_string(),
        ])
    }

    fn rename_table(&self, table: &Table, to: &str) -> StrataResult<Vec<String>> {
        let mut sql = vec![format!(
            "RENAME TABLE {} TO {}",
            self.quote(&table.name),
            self.quote(to)
        )];
        for index in table.indexes.iter().filter(|i| !i.is_primary()) {
            sql.push(self.alter(
                to,
                &format!(
                    "RENAME INDEX {} TO {}",
                    self.quote(&index.name(&table.name)),
                    self.quote(&index.name(to))
                ),
            ));
        }
        for fk in &table.foreign_keys {
            sql.push(self.alter(
                to,
                &format!("DROP FOREIGN KEY {}", self.quote(&fk.name(&table.name))),
            ));
            sql.push(self.alter(to, &format!("ADD {}", self.foreign_key_sql(to, fk))));
        }
        Ok(sql)
    }

    fn add_column(&self, table: &Table, column: &Column) -> StrataResult<Vec<String>> {
        Ok(vec![self.alter(
            &table.name,
            &format!("ADD COLUMN {}", self.column_sql(column)),
        )])
    }

    fn drop_column(&self, table: &Table, column: &str) -> StrataResult<Vec<String>> {
        Ok(vec![self.alter(
            &table.name,
            &format!("DROP COLUMN {}", self.quote(column)),
        )])
    }

    fn modify_column(&self, table: &Table, column: &Column) -> StrataResult<Vec<String>> {
        Ok(vec![self.alter(
            &table.name,
            &format!("MODIFY COLUMN {}", self.column_sql(column)),
        )])
    }

    fn change_column(
        &self,
        table: &Table,
        from: &str,
        column: &Column,
    ) -> StrataResult<Vec<String>> {
        Ok(vec![self.alter(
            &table.name,
            &format!("CHANGE COLUMN {} {}", self.quote(from), self.column_sql(column)),
        )])
    }

    fn add_index(&self, table: &Table, index: &Index) -> StrataResult<Vec<String>> {
        let quoted_table = self.quote(&table.name);
        let field = self.quote(&index.field);
        match index.kind {
            IndexKind::PrimaryKey if index.field == ID_COLUMN && !table.has_column(ID_COLUMN) => {
                Ok(vec![self.alter(
                    &table.name,
                    &format!(
                        "ADD COLUMN {} PRIMARY KEY FIRST",
                        self.column_sql(&Column::implicit_id())
                    ),
                )])
            }
            IndexKind::PrimaryKey => Ok(vec![self.alter(
                &table.name,
                &format!("ADD PRIMARY KEY ({field})"),
            )]),
            IndexKind::Unique | IndexKind::Index => {
                let name = self.quote(&index.name(&table.name));
                let unique = if index.kind == IndexKind::Unique {
                    "UNIQUE "
                } else {
                    ""
                };
                Ok(vec![
                    format!("DROP INDEX {name} ON {quoted_table}"),
                    format!("CREATE {unique}INDEX {name} ON {quoted_table} ({field})"),
                ])
            }
        }
    }

    fn drop_index(&self, table: &Table, index: &Index) -> StrataResult<Vec<String>> {
        match index.kind {
            IndexKind::PrimaryKey if index.field == ID_COLUMN => Ok(vec![self.alter(
                &table.name,
                &format!("DROP COLUMN {}", self.quote(ID_COLUMN)),
            )]),
            IndexKind::PrimaryKey => Ok(vec![self.alter(&table.name, "DROP PRIMARY KEY")]),
            IndexKind::Unique | IndexKind::Index => Ok(vec![format!(
                "DROP INDEX {} ON {}",
                self.quote(&index.name(&table.name)),
                self.quote(&table.name)
            )]),
        }
    }

    fn add_foreign_key(
        &self,
        table: &Table,
        foreign_key: &ForeignKey,
    ) -> StrataResult<Vec<String>> {
        Ok(vec![self.alter(
            &table.name,
            &format!("ADD {}", self.foreign_key_sql(&table.name, foreign_key)),
        )])
    }

    fn drop_foreign_key(&self, table: &Table, field: &str) -> StrataResult<Vec<String>> {
        Ok(vec![self.alter(
            &table.name,
            &format!(
                "DROP FOREIGN KEY {}",
                self.quote(&foreign_key_name(&table.name, field))
            ),
        )])
    }
}
