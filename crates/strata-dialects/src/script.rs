//! Rendering a whole operation list into one SQL script.
//!
//! Operations are rendered in order against a [`SchemaState`] that advances
//! after each one, so every operation sees the table shape produced by the
//! operations before it.
//!
//! For a dialect that rebuilds tables, the first rebuilding operation on a
//! table opens a *pending rebuild*. Later alterations of that table only
//! advance the state; the table is rebuilt once, straight into its
//! accumulated shape, when a whole-table operation comes up or the script
//! ends. Column renames along the way are tracked so the copy reads each
//! column from its original name.

use strata_core::StrataResult;
use strata_schema::{Operation, SchemaState, Table};

use crate::Dialect;

/// A table whose rebuild has been deferred.
#[derive(Debug)]
struct PendingRebuild {
    /// The table as it was before its first deferred operation.
    original: Table,
    /// `(current column name, original column name)` for every column that
    /// still carries data from the original table.
    columns: Vec<(String, String)>,
}

impl PendingRebuild {
    fn new(original: &Table) -> Self {
        Self {
            columns: original
                .fields
                .iter()
                .map(|c| (c.name.clone(), c.name.clone()))
                .collect(),
            original: original.clone(),
        }
    }

    fn track(&mut self, op: &Operation) {
        match op {
            Operation::DropColumn { column, .. } => {
                self.columns.retain(|(current, _)| current != column);
            }
            Operation::ChangeColumn { from, column, .. } => {
                for (current, _) in &mut self.columns {
                    if current == from {
                        current.clone_from(&column.name);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Renders `ops` into SQL statements, starting from `state`.
pub fn render_script(
    dialect: &dyn Dialect,
    ops: &[Operation],
    state: &SchemaState,
) -> StrataResult<Vec<String>> {
    let mut statements = Vec::new();
    let mut state = state.clone();
    let mut pending: Vec<PendingRebuild> = Vec::new();

    for op in ops {
        if op.is_table_alteration() {
            let name = op.table_name().unwrap_or_default();
            let position = pending.iter().position(|p| {
                state
                    .table(name)
                    .is_some_and(|t| t.name == p.original.name)
            });
            if position.is_some() || dialect.rebuilds(op) {
                let index = match position {
                    Some(index) => index,
                    None => {
                        let Some(table) = state.table(name) else {
                            // Let the dialect report the missing table.
                            dialect.render(op, &state)?;
                            continue;
                        };
                        pending.push(PendingRebuild::new(table));
                        pending.len() - 1
                    }
                };
                pending[index].track(op);
                state = state.apply(op)?;
                continue;
            }
        } else {
            flush(dialect, &mut pending, &state, &mut statements)?;
        }

        let sql = dialect.render(op, &state)?;
        tracing::debug!(op = %op, statements = sql.len(), "Rendered operation");
        statements.extend(sql);
        state = state.apply(op)?;
    }
    flush(dialect, &mut pending, &state, &mut statements)?;
    Ok(statements)
}

fn flush(
    dialect: &dyn Dialect,
    pending: &mut Vec<PendingRebuild>,
    state: &SchemaState,
    statements: &mut Vec<String>,
) -> StrataResult<()> {
    for rebuild in pending.drain(..) {
        let Some(after) = state.table(&rebuild.original.name) else {
            continue;
        };
        let sources: Vec<(String, String)> = rebuild
            .columns
            .into_iter()
            .filter(|(current, _)| after.has_column(current))
            .collect();
        // Keep the target column order of the new table.
        let sources: Vec<(String, String)> = after
            .fields
            .iter()
            .filter_map(|c| sources.iter().find(|(current, _)| *current == c.name).cloned())
            .collect();
        statements.extend(dialect.rebuild_table(&rebuild.original, after, &sources)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MySqlDialect, SqliteDialect};
    use strata_schema::{Column, ColumnType, ForeignKey, Index};

    fn start() -> SchemaState {
        SchemaState::from_tables(vec![
            Table::with_id("users").with_column(Column::varchar("name", 100)),
            Table::with_id("posts")
                .with_column(Column::varchar("title", 200))
                .with_column(Column::foreign_id("user_id"))
                .with_column(Column::new("body", ColumnType::Text))
                .with_index(Index::index("title"))
                .with_foreign_key(ForeignKey::new("user_id", "users")),
        ])
    }

    fn chain() -> Vec<Operation> {
        vec![
            Operation::DropColumn {
                table: "posts".into(),
                column: "body".into(),
            },
            Operation::AddColumn {
                table: "posts".into(),
                column: Column::varchar("summary", 300).nullable(),
            },
            Operation::ChangeColumn {
                table: "posts".into(),
                from: "title".into(),
                column: Column::varchar("headline", 200),
            },
            Operation::AddUnique {
                table: "users".into(),
                field: "name".into(),
            },
        ]
    }

    #[test]
    fn test_sqlite_chain_rebuilds_once() {
        let sql = render_script(&SqliteDialect::new(), &chain(), &start()).unwrap();
        let creates: Vec<&String> = sql.iter().filter(|s| s.starts_with("CREATE TABLE")).collect();
        assert_eq!(creates.len(), 1);
        assert!(creates[0].contains("\"headline\""));
        assert!(creates[0].contains("\"summary\""));
        assert!(!creates[0].contains("\"body\""));

        let insert = sql.iter().find(|s| s.starts_with("INSERT")).unwrap();
        assert!(insert.starts_with(
            "INSERT INTO \"posts\" (\"id\", \"headline\", \"user_id\") SELECT \"id\", \"title\", \"user_id\" FROM"
        ));
        assert!(sql.iter().any(|s| s.contains("\"posts_headline_index\"")));
        assert_eq!(
            sql.iter().filter(|s| *s == "PRAGMA foreign_keys=OFF").count(),
            1
        );
    }

    #[test]
    fn test_sqlite_other_tables_render_in_place() {
        let sql = render_script(&SqliteDialect::new(), &chain(), &start()).unwrap();
        assert_eq!(
            sql[0],
            "CREATE UNIQUE INDEX IF NOT EXISTS \"users_name_unique\" ON \"users\" (\"name\")"
        );
    }

    #[test]
    fn test_whole_table_operation_flushes_pending_rebuild() {
        let mut ops = chain();
        ops.push(Operation::RenameTable {
            from: "posts".into(),
            to: "articles".into(),
        });
        let sql = render_script(&SqliteDialect::new(), &ops, &start()).unwrap();
        let rebuild = sql.iter().position(|s| s.starts_with("CREATE TABLE \"posts\"")).unwrap();
        let rename = sql
            .iter()
            .position(|s| s == "ALTER TABLE \"posts\" RENAME TO \"articles\"")
            .unwrap();
        assert!(rebuild < rename);
    }

    #[test]
    fn test_mysql_renders_each_operation() {
        let sql = render_script(&MySqlDialect::new(), &chain(), &start()).unwrap();
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE `posts` DROP COLUMN `body`",
                "ALTER TABLE `posts` ADD COLUMN `summary` VARCHAR(300) NULL",
                "ALTER TABLE `posts` CHANGE COLUMN `title` `headline` VARCHAR(200) NOT NULL",
                "DROP INDEX `users_name_unique` ON `users`",
                "CREATE UNIQUE INDEX `users_name_unique` ON `users` (`name`)",
            ]
        );
    }

    #[test]
    fn test_render_against_renamed_table() {
        let ops = vec![
            Operation::RenameTable {
                from: "users".into(),
                to: "members".into(),
            },
            Operation::AddColumn {
                table: "members".into(),
                column: Column::varchar("email", 255).nullable(),
            },
        ];
        let sql = render_script(&MySqlDialect::new(), &ops, &start()).unwrap();
        assert_eq!(sql[0], "RENAME TABLE `users` TO `members`");
        assert_eq!(
            sql[1],
            "ALTER TABLE `members` ADD COLUMN `email` VARCHAR(255) NULL"
        );
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let ops = vec![Operation::DropColumn {
            table: "ghosts".into(),
            column: "x".into(),
        }];
        assert!(render_script(&SqliteDialect::new(), &ops, &start()).is_err());
    }
}
