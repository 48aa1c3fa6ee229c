//! Structural schema operations.
//!
//! An [`Operation`] carries everything needed both to render SQL for any
//! dialect and to be replayed against a [`SchemaState`](crate::state::SchemaState)
//! without re-parsing SQL text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::foreign_key::ForeignKey;
use crate::index::IndexKind;
use crate::table::Table;

/// A single structural change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateTable {
        table: Table,
    },
    DropTable {
        table: String,
    },
    DropTableIfExists {
        table: String,
    },
    RenameTable {
        from: String,
        to: String,
    },
    AddColumn {
        table: String,
        column: Column,
    },
    DropColumn {
        table: String,
        column: String,
    },
    /// Replace a column's definition, keeping its name.
    ModifyColumn {
        table: String,
        column: Column,
    },
    /// Rename a column and replace its definition.
    ChangeColumn {
        table: String,
        from: String,
        column: Column,
    },
    AddIndex {
        table: String,
        field: String,
    },
    AddUnique {
        table: String,
        field: String,
    },
    AddPrimaryKey {
        table: String,
        field: String,
    },
    DropIndex {
        table: String,
        field: String,
    },
    DropUnique {
        table: String,
        field: String,
    },
    DropPrimaryKey {
        table: String,
        field: String,
    },
    AddForeignKey {
        table: String,
        foreign_key: ForeignKey,
    },
    DropForeignKey {
        table: String,
        field: String,
    },
    /// Verbatim SQL. Replaying it leaves the schema state unchanged.
    RawQuery {
        sql: String,
    },
}

impl Operation {
    /// The `AddIndex`/`AddUnique`/`AddPrimaryKey` operation for `kind`.
    pub fn add_index(table: impl Into<String>, field: impl Into<String>, kind: IndexKind) -> Self {
        let (table, field) = (table.into(), field.into());
        match kind {
            IndexKind::PrimaryKey => Self::AddPrimaryKey { table, field },
            IndexKind::Unique => Self::AddUnique { table, field },
            IndexKind::Index => Self::AddIndex { table, field },
        }
    }

    /// The `DropIndex`/`DropUnique`/`DropPrimaryKey` operation for `kind`.
    pub fn drop_index(table: impl Into<String>, field: impl Into<String>, kind: IndexKind) -> Self {
        let (table, field) = (table.into(), field.into());
        match kind {
            IndexKind::PrimaryKey => Self::DropPrimaryKey { table, field },
            IndexKind::Unique => Self::DropUnique { table, field },
            IndexKind::Index => Self::DropIndex { table, field },
        }
    }

    /// The snake-case name of this operation's kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "create_table",
            Self::DropTable { .. } => "drop_table",
            Self::DropTableIfExists { .. } => "drop_table_if_exists",
            Self::RenameTable { .. } => "rename_table",
            Self::AddColumn { .. } => "add_column",
            Self::DropColumn { .. } => "drop_column",
            Self::ModifyColumn { .. } => "modify_column",
            Self::ChangeColumn { .. } => "change_column",
            Self::AddIndex { .. } => "add_index",
            Self::AddUnique { .. } => "add_unique",
            Self::AddPrimaryKey { .. } => "add_primary_key",
            Self::DropIndex { .. } => "drop_index",
            Self::DropUnique { .. } => "drop_unique",
            Self::DropPrimaryKey { .. } => "drop_primary_key",
            Self::AddForeignKey { .. } => "add_foreign_key",
            Self::DropForeignKey { .. } => "drop_foreign_key",
            Self::RawQuery { .. } => "raw_query",
        }
    }

    /// The table this operation acts on. For `RenameTable` this is the
    /// source name; `RawQuery` has none.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table } => Some(&table.name),
            Self::DropTable { table } | Self::DropTableIfExists { table } => Some(table),
            Self::RenameTable { from, .. } => Some(from),
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::ModifyColumn { table, .. }
            | Self::ChangeColumn { table, .. }
            | Self::AddIndex { table, .. }
            | Self::AddUnique { table, .. }
            | Self::AddPrimaryKey { table, .. }
            | Self::DropIndex { table, .. }
            | Self::DropUnique { table, .. }
            | Self::DropPrimaryKey { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. } => Some(table),
            Self::RawQuery { .. } => None,
        }
    }

    /// Returns `true` for operations that change a column or constraint of
    /// an existing table (as opposed to whole-table operations).
    pub const fn is_table_alteration(&self) -> bool {
        !matches!(
            self,
            Self::CreateTable { .. }
                | Self::DropTable { .. }
                | Self::DropTableIfExists { .. }
                | Self::RenameTable { .. }
                | Self::RawQuery { .. }
        )
    }

    /// A dialect-neutral, human-readable description.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("Create table {}", table.name),
            Self::DropTable { table } => format!("Drop table {table}"),
            Self::DropTableIfExists { table } => format!("Drop table {table} if it exists"),
            Self::RenameTable { from, to } => format!("Rename table {from} to {to}"),
            Self::AddColumn { table, column } => {
                format!("Add column {} ({}) to {table}", column.name, column.column_type)
            }
            Self::DropColumn { table, column } => format!("Drop column {column} from {table}"),
            Self::ModifyColumn { table, column } => {
                format!("Modify column {} on {table}", column.name)
            }
            Self::ChangeColumn {
                table,
                from,
                column,
            } => format!("Change column {from} to {} on {table}", column.name),
            Self::AddIndex { table, field } => format!("Add index on {table}.{field}"),
            Self::AddUnique { table, field } => format!("Add unique index on {table}.{field}"),
            Self::AddPrimaryKey { table, field } => format!("Add primary key on {table}.{field}"),
            Self::DropIndex { table, field } => format!("Drop index on {table}.{field}"),
            Self::DropUnique { table, field } => format!("Drop unique index on {table}.{field}"),
            Self::DropPrimaryKey { table, field } => {
                format!("Drop primary key on {table}.{field}")
            }
            Self::AddForeignKey { table, foreign_key } => format!(
                "Add foreign key {table}.{} -> {}.{}",
                foreign_key.field, foreign_key.ref_table, foreign_key.ref_field
            ),
            Self::DropForeignKey { table, field } => format!("Drop foreign key on {table}.{field}"),
            Self::RawQuery { sql } => format!("Raw SQL: {sql}"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let op = Operation::AddColumn {
            table: "users".into(),
            column: Column::varchar("bio", 500).nullable(),
        };
        assert_eq!(op.describe(), "Add column bio (varchar) to users");
        assert_eq!(op.kind(), "add_column");
        assert_eq!(op.table_name(), Some("users"));
    }

    #[test]
    fn test_index_constructors() {
        assert_eq!(
            Operation::add_index("users", "email", IndexKind::Unique),
            Operation::AddUnique {
                table: "users".into(),
                field: "email".into()
            }
        );
        assert_eq!(
            Operation::drop_index("users", "id", IndexKind::PrimaryKey).kind(),
            "drop_primary_key"
        );
    }

    #[test]
    fn test_is_table_alteration() {
        assert!(!Operation::DropTable { table: "t".into() }.is_table_alteration());
        assert!(Operation::DropColumn {
            table: "t".into(),
            column: "c".into()
        }
        .is_table_alteration());
    }

    #[test]
    fn test_serde_tag() {
        let op = Operation::RenameTable {
            from: "users".into(),
            to: "members".into(),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"op": "rename_table", "from": "users", "to": "members"})
        );
        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }
}
