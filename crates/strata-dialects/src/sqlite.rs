//! `SQLite` dialect.
//!
//! `SQLite` cannot alter most column and constraint properties in place, so
//! every column- or constraint-level operation is applied with the rebuild
//! strategy:
//!
//! 1. `PRAGMA foreign_keys=OFF` and `PRAGMA legacy_alter_table=ON`
//! 2. rename the live table to a random temporary name
//! 3. `CREATE TABLE` the new shape
//! 4. `INSERT INTO new (...) SELECT ... FROM tmp` over the shared columns,
//!    with a zero value for new `NOT NULL` columns that have no default
//! 5. `DROP TABLE tmp`, then recreate the indexes
//! 6. restore both pragmas
//!
//! `legacy_alter_table` keeps the temporary rename from rewriting foreign
//! keys in other tables that point at the rebuilt table.

use rand::distributions::Alphanumeric;
use rand::Rng;
use strata_core::settings::Engine;
use strata_core::StrataResult;
use strata_schema::{
    Column, ColumnType, ForeignKey, Index, IndexKind, Operation, SchemaState, Table, Value,
};

use crate::Dialect;

/// Prefix of the temporary tables used while rebuilding.
pub const REBUILD_PREFIX: &str = "_strata_tmp_";

/// Dialect for `SQLite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub const fn new() -> Self {
        Self
    }

    /// The storage type `SQLite` keeps for a semantic type.
    const fn storage_type(column_type: ColumnType) -> ColumnType {
        match column_type {
            ColumnType::Enum | ColumnType::LongText | ColumnType::Json | ColumnType::Uuid => {
                ColumnType::Text
            }
            other => other,
        }
    }

    fn temp_table_name(table: &str) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        format!("{REBUILD_PREFIX}{table}_{}", suffix.to_lowercase())
    }

    /// The value copied into a column that has no source in the old table.
    ///
    /// `None` when the column can be left to its own default: it accepts
    /// NULL, renders a `DEFAULT`, or auto-increments.
    fn fill_sql(&self, column: &Column) -> Option<String> {
        if column.nullable || column.auto_increment || self.default_sql(column).is_some() {
            return None;
        }
        let zero = match column.column_type {
            ColumnType::TinyInt
            | ColumnType::SmallInt
            | ColumnType::Int
            | ColumnType::BigInt
            | ColumnType::Decimal
            | ColumnType::Float
            | ColumnType::Double
            | ColumnType::Boolean => "0".to_string(),
            ColumnType::Blob => "X''".to_string(),
            ColumnType::Enum => column
                .enum_options()
                .first()
                .map_or_else(|| "''".to_string(), |o| self.literal(&Value::from(o.as_str()))),
            _ => "''".to_string(),
        };
        Some(zero)
    }

    fn index_sql(&self, table: &str, index: &Index) -> Option<String> {
        let unique = match index.kind {
            IndexKind::PrimaryKey => return None,
            IndexKind::Unique => "UNIQUE ",
            IndexKind::Index => "",
        };
        Some(format!(
            "CREATE {unique}INDEX IF NOT EXISTS {} ON {} ({})",
            self.quote(&index.name(table)),
            self.quote(table),
            self.quote(&index.field)
        ))
    }

    fn indexes_sql(&self, table: &Table) -> Vec<String> {
        table
            .indexes
            .iter()
            .filter_map(|index| self.index_sql(&table.name, index))
            .collect()
    }

    /// Rebuilds `table` into the shape it has after `op`.
    fn rebuild_for(&self, table: &Table, op: &Operation) -> StrataResult<Vec<String>> {
        let state = SchemaState::from_tables(vec![table.clone()]).apply(op)?;
        let Some(after) = state.table(&table.name) else {
            return Ok(Vec::new());
        };
        let renamed = match op {
            Operation::ChangeColumn { from, column, .. } => Some((column.name.as_str(), from.as_str())),
            _ => None,
        };
        let sources: Vec<(String, String)> = after
            .fields
            .iter()
            .filter_map(|c| match renamed {
                Some((to, from)) if c.name == to => Some((to.to_string(), from.to_string())),
                _ if table.has_column(&c.name) => Some((c.name.clone(), c.name.clone())),
                _ => None,
            })
            .collect();
        self.rebuild_table(table, after, &sources)
    }
}

impl Dialect for SqliteDialect {
    fn engine(&self) -> Engine {
        Engine::Sqlite
    }

    fn quote(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn column_type_sql(&self, column: &Column) -> String {
        match Self::storage_type(column.column_type) {
            ColumnType::TinyInt => "TINYINT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Int => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Char => "CHAR",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Time => "TIME",
            ColumnType::Blob => "BLOB",
            ColumnType::Text
            | ColumnType::LongText
            | ColumnType::Json
            | ColumnType::Uuid
            | ColumnType::Enum => "TEXT",
        }
        .to_string()
    }

    fn column_sql(&self, column: &Column) -> String {
        let name = self.quote(&column.name);
        // AUTOINCREMENT is only legal on an INTEGER PRIMARY KEY.
        if column.auto_increment {
            return format!("{name} INTEGER PRIMARY KEY AUTOINCREMENT");
        }
        let mut sql = format!("{name} {}", self.column_type_sql(column));
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default_sql(column) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default);
        }
        sql
    }

    fn table_sql(&self, table: &Table) -> String {
        let mut parts: Vec<String> = table.fields.iter().map(|c| self.column_sql(c)).collect();
        if let Some(pk) = table.primary_key() {
            let inline = table.column(&pk.field).is_some_and(|c| c.auto_increment);
            if !inline {
                parts.push(format!("PRIMARY KEY ({})", self.quote(&pk.field)));
            }
        }
        for fk in &table.foreign_keys {
            parts.push(format!(
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
                self.quote(&fk.name(&table.name)),
                self.quote(&fk.field),
                self.quote(&fk.ref_table),
                self.quote(&fk.ref_field),
                fk.on_delete.as_sql()
            ));
        }
        format!("CREATE TABLE {} ({})", self.quote(&table.name), parts.join(", "))
    }

    fn create_table(&self, table: &Table) -> StrataResult<Vec<String>> {
        let mut sql = vec![self.table_sql(table)];
        sql.extend(self.indexes_sql(table));
        Ok(sql)
    }

    fn drop_table(&self, table: &str, if_exists: bool) -> StrataResult<Vec<String>> {
        let if_exists = if if_exists { "IF EXISTS " } else { "" };
        Ok(vec![format!("DROP TABLE {if_exists}{}", self.quote(table))])
    }

    fn rename_table(&self, table: &Table, to: &str) -> StrataResult<Vec<String>> {
        let mut sql = vec![format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote(&table.name),
            self.quote(to)
        )];
        for index in table.indexes.iter().filter(|i| !i.is_primary()) {
            sql.push(format!(
                "DROP INDEX IF EXISTS {}",
                self.quote(&index.name(&table.name))
            ));
            sql.extend(self.index_sql(to, index));
        }
        Ok(sql)
    }

    fn add_column(&self, table: &Table, column: &Column) -> StrataResult<Vec<String>> {
        self.rebuild_for(
            table,
            &Operation::AddColumn {
                table: table.name.clone(),
                column: column.clone(),
            },
        )
    }

    fn drop_column(&self, table: &Table, column: &str) -> StrataResult<Vec<String>> {
        self.rebuild_for(
            table,
            &Operation::DropColumn {
                table: table.name.clone(),
                column: column.to_string(),
            },
        )
    }

    fn modify_column(&self, table: &Table, column: &Column) -> StrataResult<Vec<String>> {
        self.rebuild_for(
            table,
            &Operation::ModifyColumn {
                table: table.name.clone(),
                column: column.clone(),
            },
        )
    }

    fn change_column(
        &self,
        table: &Table,
        from: &str,
        column: &Column,
    ) -> StrataResult<Vec<String>> {
        self.rebuild_for(
            table,
            &Operation::ChangeColumn {
                table: table.name.clone(),
                from: from.to_string(),
                column: column.clone(),
            },
        )
    }

    fn add_index(&self, table: &Table, index: &Index) -> StrataResult<Vec<String>> {
        match self.index_sql(&table.name, index) {
            Some(sql) => Ok(vec![sql]),
            None => self.rebuild_for(
                table,
                &Operation::AddPrimaryKey {
                    table: table.name.clone(),
                    field: index.field.clone(),
                },
            ),
        }
    }

    fn drop_index(&self, table: &Table, index: &Index) -> StrataResult<Vec<String>> {
        if index.is_primary() {
            return self.rebuild_for(
                table,
                &Operation::DropPrimaryKey {
                    table: table.name.clone(),
                    field: index.field.clone(),
                },
            );
        }
        Ok(vec![format!(
            "DROP INDEX IF EXISTS {}",
            self.quote(&index.name(&table.name))
        )])
    }

    fn add_foreign_key(
        &self,
        table: &Table,
        foreign_key: &ForeignKey,
    ) -> StrataResult<Vec<String>> {
        self.rebuild_for(
            table,
            &Operation::AddForeignKey {
                table: table.name.clone(),
                foreign_key: foreign_key.clone(),
            },
        )
    }

    fn drop_foreign_key(&self, table: &Table, field: &str) -> StrataResult<Vec<String>> {
        self.rebuild_for(
            table,
            &Operation::DropForeignKey {
                table: table.name.clone(),
                field: field.to_string(),
            },
        )
    }

    fn normalize_column(&self, column: &Column) -> Column {
        Column {
            column_type: Self::storage_type(column.column_type),
            size: None,
            unsigned: false,
            ..column.clone()
        }
    }

    fn rebuilds(&self, op: &Operation) -> bool {
        matches!(
            op,
            Operation::AddColumn { .. }
                | Operation::DropColumn { .. }
                | Operation::ModifyColumn { .. }
                | Operation::ChangeColumn { .. }
                | Operation::AddPrimaryKey { .. }
                | Operation::DropPrimaryKey { .. }
                | Operation::AddForeignKey { .. }
                | Operation::DropForeignKey { .. }
        )
    }

    fn rebuild_table(
        &self,
        before: &Table,
        after: &Table,
        sources: &[(String, String)],
    ) -> StrataResult<Vec<String>> {
        let tmp = Self::temp_table_name(&after.name);
        tracing::debug!(table = %after.name, tmp = %tmp, "Rebuilding SQLite table");

        let mut sql = vec![
            "PRAGMA foreign_keys=OFF".to_string(),
            "PRAGMA legacy_alter_table=ON".to_string(),
            format!(
                "ALTER TABLE {} RENAME TO {}",
                self.quote(&before.name),
                self.quote(&tmp)
            ),
            self.table_sql(after),
        ];
        if !sources.is_empty() {
            let mut targets = Vec::new();
            let mut columns = Vec::new();
            for column in &after.fields {
                if let Some((_, from)) = sources.iter().find(|(to, _)| *to == column.name) {
                    targets.push(self.quote(&column.name));
                    columns.push(self.quote(from));
                } else if let Some(fill) = self.fill_sql(column) {
                    targets.push(self.quote(&column.name));
                    columns.push(fill);
                }
            }
            sql.push(format!(
                "INSERT INTO {} ({}) SELECT {} FROM {}",
                self.quote(&after.name),
                targets.join(", "),
                columns.join(", "),
                self.quote(&tmp)
            ));
        }
        sql.push(format!("DROP TABLE {}", self.quote(&tmp)));
        sql.extend(self.indexes_sql(after));
        sql.push("PRAGMA legacy_alter_table=OFF".to_string());
        sql.push("PRAGMA foreign_keys=ON".to_string());
        Ok(sql)
    }
}
