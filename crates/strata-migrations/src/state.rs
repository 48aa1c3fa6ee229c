//! Reconstructing the current schema from migration history.
//!
//! The [`StateBuilder`] replays the forward operations of every recorded
//! migration, in id order, starting from an empty schema. Whether a migration
//! has actually been applied to the database does not matter: the result is
//! the schema the migration history describes, which is the baseline new
//! changes are diffed against.
//!
//! Within one migration a renamed table answers to both its old and its new
//! name. The rename settles once the whole migration has been replayed.
//!
//! A migration that carries a baseline replaces the state replayed so far
//! with that baseline before its own operations are applied.

use strata_core::StrataResult;
use strata_schema::SchemaState;

use crate::artifact::Migration;

/// Replays migration history into a [`SchemaState`].
#[derive(Debug, Clone, Default)]
pub struct StateBuilder {
    state: SchemaState,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing state instead of an empty schema.
    pub const fn from_state(state: SchemaState) -> Self {
        Self { state }
    }

    /// Replays one migration's forward operations.
    pub fn replay(&mut self, migration: &Migration) -> StrataResult<&mut Self> {
        tracing::trace!(migration = %migration.name, ops = migration.forward.len(), "Replaying");
        if !migration.baseline.is_empty() {
            self.state = SchemaState::from_tables(migration.baseline.clone());
        }
        self.state = self.state.apply_all(&migration.forward)?.finish();
        Ok(self)
    }

    pub fn state(&self) -> &SchemaState {
        &self.state
    }

    pub fn into_state(self) -> SchemaState {
        self.state
    }

    /// Replays `migrations` (ordered by id) from an empty schema.
    pub fn build(migrations: &[Migration]) -> StrataResult<SchemaState> {
        let mut builder = Self::new();
        for migration in migrations {
            builder.replay(migration)?;
        }
        Ok(builder.into_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_schema::{Column, ForeignKey, Index, Operation, Table};

    fn users() -> Table {
        Table::with_id("users")
            .with_column(Column::varchar("name", 100))
            .with_column(Column::varchar("email", 255))
    }

    #[test]
    fn test_empty_history() {
        assert!(StateBuilder::build(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_replay_in_order() {
        let history = vec![
            Migration::new(1, vec![Operation::CreateTable { table: users() }], vec![]),
            Migration::new(
                2,
                vec![
                    Operation::AddColumn {
                        table: "users".into(),
                        column: Column::varchar("bio", 500).nullable(),
                    },
                    Operation::AddUnique {
                        table: "users".into(),
                        field: "email".into(),
                    },
                ],
                vec![],
            ),
        ];
        let state = StateBuilder::build(&history).unwrap();
        let users = state.table("users").unwrap();
        assert_eq!(users.fields.len(), 4);
        assert!(users.index("email", strata_schema::IndexKind::Unique).is_some());
    }

    #[test]
    fn test_rename_resolves_both_names_then_settles() {
        let history = vec![
            Migration::new(1, vec![Operation::CreateTable { table: users() }], vec![]),
            Migration::new(
                2,
                vec![
                    Operation::RenameTable {
                        from: "users".into(),
                        to: "members".into(),
                    },
                    // Still addressed by the old name within the same migration.
                    Operation::DropColumn {
                        table: "users".into(),
                        column: "email".into(),
                    },
                    Operation::AddColumn {
                        table: "members".into(),
                        column: Column::varchar("handle", 50),
                    },
                ],
                vec![],
            ),
        ];
        let state = StateBuilder::build(&history).unwrap();
        let members = state.table("members").unwrap();
        assert!(members.old_name.is_none());
        assert!(!members.has_column("email"));
        assert!(members.has_column("handle"));
        assert!(state.table("users").is_none());
    }

    #[test]
    fn test_replay_drops_and_foreign_keys() {
        let posts = Table::with_id("posts")
            .with_column(Column::foreign_id("user_id"))
            .with_index(Index::index("user_id"))
            .with_foreign_key(ForeignKey::new("user_id", "users"));
        let history = vec![
            Migration::new(
                1,
                vec![
                    Operation::CreateTable { table: users() },
                    Operation::CreateTable { table: posts },
                ],
                vec![],
            ),
            Migration::new(
                2,
                vec![
                    Operation::DropForeignKey {
                        table: "posts".into(),
                        field: "user_id".into(),
                    },
                    Operation::DropTable {
                        table: "users".into(),
                    },
                ],
                vec![],
            ),
        ];
        let state = StateBuilder::build(&history).unwrap();
        assert_eq!(state.tables().len(), 1);
        assert!(state.table("posts").unwrap().foreign_keys.is_empty());
    }

    #[test]
    fn test_replay_starts_from_baseline() {
        let first = Migration::new(
            1,
            vec![Operation::AddColumn {
                table: "users".into(),
                column: Column::varchar("bio", 500).nullable(),
            }],
            vec![],
        )
        .with_baseline(vec![users()]);
        let state = StateBuilder::build(&[first]).unwrap();
        assert!(state.table("users").unwrap().has_column("bio"));
    }

    #[test]
    fn test_alter_unknown_table_fails() {
        let history = vec![Migration::new(
            1,
            vec![Operation::AddColumn {
                table: "ghosts".into(),
                column: Column::varchar("x", 1),
            }],
            vec![],
        )];
        assert!(StateBuilder::build(&history).is_err());
    }
}
