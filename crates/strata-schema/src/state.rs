//! Replaying operations against a list of tables.
//!
//! [`SchemaState::apply`] is a pure function: it returns the state that
//! results from one [`Operation`] and never touches the receiver. A rename
//! keeps the table reachable under its old name (via [`Table::old_name`])
//! until [`SchemaState::finish`] is called, so later operations in the same
//! migration may refer to either name.

use strata_core::{StrataError, StrataResult};

use crate::column::Column;
use crate::index::{Index, IndexKind};
use crate::operation::Operation;
use crate::table::Table;
use crate::ID_COLUMN;

/// An ordered set of table snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaState {
    tables: Vec<Table>,
}

impl SchemaState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Looks a table up by name, falling back to a pending rename's old name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.position(name).map(|i| &self.tables[i])
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.name == name)
            .or_else(|| self.tables.iter().position(|t| t.answers_to(name)))
    }

    /// Returns the state after applying every operation in order.
    pub fn apply_all<'a>(&self, ops: impl IntoIterator<Item = &'a Operation>) -> StrataResult<Self> {
        let mut state = self.clone();
        for op in ops {
            state = state.apply(op)?;
        }
        Ok(state)
    }

    /// Clears every pending rename marker.
    #[must_use]
    pub fn finish(&self) -> Self {
        Self {
            tables: self.tables.iter().map(Table::settled).collect(),
        }
    }

    /// Compares two states table by table, ignoring table, column, index,
    /// and foreign key order as well as pending rename markers.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.tables.len() == other.tables.len()
            && self
                .tables
                .iter()
                .all(|table| other.tables.iter().any(|t| t.same_shape(table)))
    }

    /// Returns the state that results from applying `op`.
    pub fn apply(&self, op: &Operation) -> StrataResult<Self> {
        let mut tables = self.tables.clone();
        match op {
            Operation::CreateTable { table } => {
                let table = table.settled();
                match tables.iter().position(|t| t.name == table.name) {
                    Some(i) => tables[i] = table,
                    None => tables.push(table),
                }
            }
            Operation::DropTable { table } | Operation::DropTableIfExists { table } => {
                if let Some(i) = self.position(table) {
                    tables.remove(i);
                }
            }
            Operation::RenameTable { from, to } => {
                let i = self.require(from)?;
                let renamed = &mut tables[i];
                renamed.old_name = Some(from.clone());
                renamed.name.clone_from(to);
            }
            Operation::RawQuery { .. } => {}
            _ => {
                let name = op.table_name().unwrap_or_default();
                let i = self.require(name)?;
                tables[i] = alter(&tables[i], op)?;
            }
        }
        Ok(Self { tables })
    }

    fn require(&self, name: &str) -> StrataResult<usize> {
        self.position(name)
            .ok_or_else(|| StrataError::InvalidSchema(format!("table '{name}' does not exist")))
    }
}

/// Applies a column- or constraint-level operation to one table.
fn alter(table: &Table, op: &Operation) -> StrataResult<Table> {
    let mut table = table.clone();
    match op {
        Operation::AddColumn { column, .. } => {
            if !table.has_column(&column.name) {
                table.fields.push(column.clone());
            }
        }
        Operation::DropColumn { column, .. } => {
            drop_column(&mut table, column);
        }
        Operation::ModifyColumn { column, .. } => {
            let slot = column_slot(&mut table, &column.name)?;
            *slot = column.clone();
        }
        Operation::ChangeColumn { from, column, .. } => {
            let slot = column_slot(&mut table, from)?;
            *slot = column.clone();
            for index in &mut table.indexes {
                if index.field == *from {
                    index.field.clone_from(&column.name);
                }
            }
            for fk in &mut table.foreign_keys {
                if fk.field == *from {
                    fk.field.clone_from(&column.name);
                }
            }
        }
        Operation::AddIndex { field, .. } => add_index(&mut table, field, IndexKind::Index),
        Operation::AddUnique { field, .. } => add_index(&mut table, field, IndexKind::Unique),
        Operation::AddPrimaryKey { field, .. } => {
            if field == ID_COLUMN && !table.has_column(ID_COLUMN) {
                table.fields.insert(0, Column::implicit_id());
            }
            if table.index(field, IndexKind::PrimaryKey).is_none() {
                table.indexes.retain(|i| !i.is_primary());
                table.indexes.push(Index::primary(field.clone()));
            }
        }
        Operation::DropIndex { field, .. } => {
            table
                .indexes
                .retain(|i| !(i.field == *field && i.kind == IndexKind::Index));
        }
        Operation::DropUnique { field, .. } => {
            table
                .indexes
                .retain(|i| !(i.field == *field && i.kind == IndexKind::Unique));
        }
        Operation::DropPrimaryKey { field, .. } => {
            if field == ID_COLUMN {
                drop_column(&mut table, ID_COLUMN);
            } else {
                table
                    .indexes
                    .retain(|i| !(i.field == *field && i.is_primary()));
            }
        }
        Operation::AddForeignKey { foreign_key, .. } => {
            if table.foreign_key(&foreign_key.field).is_none() {
                table.foreign_keys.push(foreign_key.clone());
            }
        }
        Operation::DropForeignKey { field, .. } => {
            table.foreign_keys.retain(|fk| fk.field != *field);
        }
        Operation::CreateTable { .. }
        | Operation::DropTable { .. }
        | Operation::DropTableIfExists { .. }
        | Operation::RenameTable { .. }
        | Operation::RawQuery { .. } => {}
    }
    Ok(table)
}

fn column_slot<'a>(table: &'a mut Table, name: &str) -> StrataResult<&'a mut Column> {
    let table_name = table.name.clone();
    table
        .fields
        .iter_mut()
        .find(|c| c.name == name)
        .ok_or_else(|| {
            StrataError::InvalidSchema(format!("column '{table_name}.{name}' does not exist"))
        })
}

fn drop_column(table: &mut Table, name: &str) {
    table.fields.retain(|c| c.name != name);
    table.indexes.retain(|i| i.field != name);
    table.foreign_keys.retain(|fk| fk.field != name);
}

fn add_index(table: &mut Table, field: &str, kind: IndexKind) {
    if table.index(field, kind).is_none() {
        table.indexes.push(Index::new(field, kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;
    use crate::foreign_key::ForeignKey;

    fn users() -> Table {
        Table::with_id("users")
            .with_column(Column::varchar("name", 100))
            .with_column(Column::varchar("email", 255))
            .with_index(Index::unique("email"))
    }

    fn state() -> SchemaState {
        SchemaState::new()
            .apply(&Operation::CreateTable { table: users() })
            .unwrap()
    }

    #[test]
    fn test_apply_is_pure() {
        let before = state();
        let after = before
            .apply(&Operation::DropTable {
                table: "users".into(),
            })
            .unwrap();
        assert!(after.is_empty());
        assert_eq!(before.tables().len(), 1);
    }

    #[test]
    fn test_rename_resolves_both_names_until_finish() {
        let renamed = state()
            .apply(&Operation::RenameTable {
                from: "users".into(),
                to: "members".into(),
            })
            .unwrap();
        assert!(renamed.table("members").is_some());
        assert!(renamed.table("users").is_some());

        let with_bio = renamed
            .apply(&Operation::AddColumn {
                table: "users".into(),
                column: Column::varchar("bio", 500).nullable(),
            })
            .unwrap();
        assert!(with_bio.table("members").unwrap().has_column("bio"));

        let finished = with_bio.finish();
        assert!(finished.table("users").is_none());
        assert_eq!(finished.table("members").unwrap().old_name, None);
    }

    #[test]
    fn test_add_column_is_idempotent() {
        let op = Operation::AddColumn {
            table: "users".into(),
            column: Column::varchar("bio", 500),
        };
        let once = state().apply(&op).unwrap();
        let twice = once.apply(&op).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_drop_column_removes_dependent_index() {
        let after = state()
            .apply(&Operation::DropColumn {
                table: "users".into(),
                column: "email".into(),
            })
            .unwrap();
        let table = after.table("users").unwrap();
        assert!(!table.has_column("email"));
        assert!(table.index("email", IndexKind::Unique).is_none());
    }

    #[test]
    fn test_modify_column_replaces_in_place() {
        let after = state()
            .apply(&Operation::ModifyColumn {
                table: "users".into(),
                column: Column::new("name", ColumnType::Text).nullable(),
            })
            .unwrap();
        let table = after.table("users").unwrap();
        assert_eq!(table.fields[1].name, "name");
        assert_eq!(table.fields[1].column_type, ColumnType::Text);
    }

    #[test]
    fn test_change_column_renames_references() {
        let after = state()
            .apply(&Operation::ChangeColumn {
                table: "users".into(),
                from: "email".into(),
                column: Column::varchar("mail", 255),
            })
            .unwrap();
        let table = after.table("users").unwrap();
        assert!(table.has_column("mail"));
        assert!(table.index("mail", IndexKind::Unique).is_some());
    }

    #[test]
    fn test_modify_missing_column_errors() {
        let result = state().apply(&Operation::ModifyColumn {
            table: "users".into(),
            column: Column::varchar("missing", 1),
        });
        assert!(matches!(result, Err(StrataError::InvalidSchema(_))));
    }

    #[test]
    fn test_add_index_is_idempotent() {
        let op = Operation::AddUnique {
            table: "users".into(),
            field: "email".into(),
        };
        let after = state().apply(&op).unwrap();
        assert_eq!(after.table("users").unwrap().indexes.len(), 2);
    }

    #[test]
    fn test_drop_implicit_primary_key_drops_id() {
        let after = state()
            .apply(&Operation::DropPrimaryKey {
                table: "users".into(),
                field: "id".into(),
            })
            .unwrap();
        let table = after.table("users").unwrap();
        assert!(!table.has_column("id"));
        assert!(table.primary_key().is_none());

        let restored = after
            .apply(&Operation::AddPrimaryKey {
                table: "users".into(),
                field: "id".into(),
            })
            .unwrap();
        let table = restored.table("users").unwrap();
        assert_eq!(table.fields[0], Column::implicit_id());
        assert!(table.has_implicit_primary_key());
    }

    #[test]
    fn test_foreign_keys() {
        let posts = Table::with_id("posts").with_column(Column::foreign_id("user_id"));
        let s = state()
            .apply(&Operation::CreateTable { table: posts })
            .unwrap()
            .apply(&Operation::AddForeignKey {
                table: "posts".into(),
                foreign_key: ForeignKey::new("user_id", "users"),
            })
            .unwrap();
        assert!(s.table("posts").unwrap().foreign_key("user_id").is_some());

        let s = s
            .apply(&Operation::DropForeignKey {
                table: "posts".into(),
                field: "user_id".into(),
            })
            .unwrap();
        assert!(s.table("posts").unwrap().foreign_keys.is_empty());
    }

    #[test]
    fn test_drop_missing_table_is_noop() {
        let after = state()
            .apply(&Operation::DropTableIfExists {
                table: "ghosts".into(),
            })
            .unwrap();
        assert_eq!(after, state());
    }

    #[test]
    fn test_alter_missing_table_errors() {
        let result = state().apply(&Operation::AddIndex {
            table: "ghosts".into(),
            field: "x".into(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_raw_query_is_ignored() {
        let after = state()
            .apply(&Operation::RawQuery {
                sql: "UPDATE users SET name = 'x'".into(),
            })
            .unwrap();
        assert_eq!(after, state());
    }

    #[test]
    fn test_same_shape_ignores_order() {
        let a = SchemaState::from_tables(vec![users(), Table::with_id("tags")]);
        let b = SchemaState::from_tables(vec![Table::with_id("tags"), users()]);
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&SchemaState::from_tables(vec![users()])));
    }
}
