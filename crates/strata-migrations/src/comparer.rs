//! The table comparer: diffing desired tables against the current schema.
//!
//! [`TableComparer::compare`] produces a forward operation list that turns
//! the current schema into the desired one, and the exact reverse list.
//! Passes run in a fixed order:
//!
//! 1. tables to create, parents first
//! 2. tables to rename, detected purely structurally: an unclaimed current
//!    table whose non-`id` column names equal a new desired table's
//! 3. tables to drop, children first
//! 4. foreign keys to drop, then indexes to drop
//! 5. columns to add, indexes to add, foreign keys to add, columns to
//!    modify, and columns to drop
//!
//! The implicit `id` column never takes part in column diffs.
//!
//! Reverse operations address a renamed table by its original name. They are
//! collected in application order and reversed as a whole, except that the
//! reverse renames run first.

use std::collections::HashSet;

use strata_core::{StrataError, StrataResult};
use strata_dialects::SharedDialect;
use strata_schema::{Column, Operation, Table, ID_COLUMN};

use crate::topology::sort_for_creation;

/// The result of a comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    pub forward: Vec<Operation>,
    pub reverse: Vec<Operation>,
}

impl Changes {
    /// Returns `true` if the schemas already agree.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty()
    }
}

/// A current table matched with its desired counterpart.
struct Pair<'a> {
    current: &'a Table,
    desired: &'a Table,
}

impl Pair<'_> {
    /// The name forward operations use.
    fn forward_name(&self) -> &str {
        &self.desired.name
    }

    /// The name reverse operations use: the table's pre-rename identity.
    fn reverse_name(&self) -> &str {
        &self.current.name
    }
}

/// Accumulates forward/reverse operation pairs.
#[derive(Default)]
struct Script {
    forward: Vec<Operation>,
    reverse: Vec<Operation>,
    reverse_renames: Vec<Operation>,
}

impl Script {
    fn push(&mut self, forward: Operation, reverse: Operation) {
        tracing::trace!(forward = %forward, reverse = %reverse, "Detected change");
        self.forward.push(forward);
        self.reverse.push(reverse);
    }

    fn finish(mut self) -> Changes {
        self.reverse.reverse();
        let mut reverse = self.reverse_renames;
        reverse.extend(self.reverse);
        Changes {
            forward: self.forward,
            reverse,
        }
    }
}

/// Computes forward and reverse scripts between two sets of tables.
///
/// The dialect is used only to normalize columns, so that differences the
/// target engine cannot store never produce a change.
#[derive(Debug, Clone)]
pub struct TableComparer {
    dialect: SharedDialect,
}

impl TableComparer {
    pub fn new(dialect: SharedDialect) -> Self {
        Self { dialect }
    }

    /// Compares `current` against `desired`.
    pub fn compare(&self, current: &[Table], desired: &[Table]) -> StrataResult<Changes> {
        let mut script = Script::default();

        let unmatched_current: Vec<&Table> = current
            .iter()
            .filter(|c| !desired.iter().any(|d| d.name == c.name))
            .collect();
        let mut pairs: Vec<Pair<'_>> = desired
            .iter()
            .filter_map(|d| {
                current
                    .iter()
                    .find(|c| c.name == d.name)
                    .map(|c| Pair {
                        current: c,
                        desired: d,
                    })
            })
            .collect();

        // Passes 1 and 2: new desired tables are either renames or creates.
        let mut creates: Vec<Table> = Vec::new();
        let mut renames: Vec<Pair<'_>> = Vec::new();
        let mut claimed: HashSet<&str> = HashSet::new();
        for d in desired.iter().filter(|d| !current.iter().any(|c| c.name == d.name)) {
            let names = d.column_name_set();
            let candidates: Vec<&Table> = unmatched_current
                .iter()
                .copied()
                .filter(|c| c.column_name_set() == names)
                .collect();
            match candidates.as_slice() {
                [] => creates.push(d.clone()),
                [c] => {
                    let c: &Table = *c;
                    if !claimed.insert(c.name.as_str()) {
                        return Err(StrataError::DiffAmbiguity(format!(
                            "table '{}' matches more than one desired table by shape",
                            c.name
                        )));
                    }
                    renames.push(Pair {
                        current: c,
                        desired: d,
                    });
                }
                many => {
                    let names: Vec<&str> = many.iter().map(|c| c.name.as_str()).collect();
                    return Err(StrataError::DiffAmbiguity(format!(
                        "desired table '{}' could be a rename of any of: {}",
                        d.name,
                        names.join(", ")
                    )));
                }
            }
        }

        for table in sort_for_creation(&creates)? {
            let name = table.name.clone();
            script.push(
                Operation::CreateTable { table },
                Operation::DropTable { table: name },
            );
        }

        for pair in &renames {
            tracing::debug!(from = %pair.current.name, to = %pair.desired.name, "Detected table rename");
            script.forward.push(Operation::RenameTable {
                from: pair.current.name.clone(),
                to: pair.desired.name.clone(),
            });
            script.reverse_renames.push(Operation::RenameTable {
                from: pair.desired.name.clone(),
                to: pair.current.name.clone(),
            });
        }

        // Pass 3: drops, children before parents.
        let drops: Vec<Table> = unmatched_current
            .iter()
            .filter(|c| !claimed.contains(c.name.as_str()))
            .map(|c| (*c).clone())
            .collect();
        for table in sort_for_creation(&drops)?.into_iter().rev() {
            let name = table.name.clone();
            script.push(
                Operation::DropTable { table: name },
                Operation::CreateTable { table },
            );
        }

        pairs.extend(renames);

        // Pass 4: constraint drops.
        for pair in &pairs {
            Self::drop_foreign_keys(pair, &mut script);
        }
        for pair in &pairs {
            Self::drop_indexes(pair, &mut script);
        }

        // Pass 5: additions, modifications, column drops.
        for pair in &pairs {
            Self::add_columns(pair, &mut script);
        }
        for pair in &pairs {
            Self::add_indexes(pair, &mut script);
        }
        for pair in &pairs {
            Self::add_foreign_keys(pair, &mut script);
        }
        for pair in &pairs {
            self.modify_columns(pair, &mut script);
        }
        for pair in &pairs {
            Self::drop_columns(pair, &mut script);
        }

        let changes = script.finish();
        tracing::debug!(
            forward = changes.forward.len(),
            reverse = changes.reverse.len(),
            "Compared schemas"
        );
        Ok(changes)
    }

    fn drop_foreign_keys(pair: &Pair<'_>, script: &mut Script) {
        for fk in &pair.current.foreign_keys {
            if !pair.desired.foreign_keys.contains(fk) {
                script.push(
                    Operation::DropForeignKey {
                        table: pair.forward_name().to_string(),
                        field: fk.field.clone(),
                    },
                    Operation::AddForeignKey {
                        table: pair.reverse_name().to_string(),
                        foreign_key: fk.clone(),
                    },
                );
            }
        }
    }

    fn drop_indexes(pair: &Pair<'_>, script: &mut Script) {
        for index in &pair.current.indexes {
            if !pair.desired.indexes.contains(index) {
                script.push(
                    Operation::drop_index(pair.forward_name(), &index.field, index.kind),
                    Operation::add_index(pair.reverse_name(), &index.field, index.kind),
                );
            }
        }
    }

    fn add_columns(pair: &Pair<'_>, script: &mut Script) {
        for column in diffable(&pair.desired.fields) {
            if !pair.current.has_column(&column.name) {
                script.push(
                    Operation::AddColumn {
                        table: pair.forward_name().to_string(),
                        column: column.clone(),
                    },
                    Operation::DropColumn {
                        table: pair.reverse_name().to_string(),
                        column: column.name.clone(),
                    },
                );
            }
        }
    }

    fn add_indexes(pair: &Pair<'_>, script: &mut Script) {
        for index in &pair.desired.indexes {
            if !pair.current.indexes.contains(index) {
                script.push(
                    Operation::add_index(pair.forward_name(), &index.field, index.kind),
                    Operation::drop_index(pair.reverse_name(), &index.field, index.kind),
                );
            }
        }
    }

    fn add_foreign_keys(pair: &Pair<'_>, script: &mut Script) {
        for fk in &pair.desired.foreign_keys {
            if !pair.current.foreign_keys.contains(fk) {
                script.push(
                    Operation::AddForeignKey {
                        table: pair.forward_name().to_string(),
                        foreign_key: fk.clone(),
                    },
                    Operation::DropForeignKey {
                        table: pair.reverse_name().to_string(),
                        field: fk.field.clone(),
                    },
                );
            }
        }
    }

    fn modify_columns(&self, pair: &Pair<'_>, script: &mut Script) {
        for desired in diffable(&pair.desired.fields) {
            let Some(current) = pair.current.column(&desired.name) else {
                continue;
            };
            if self.dialect.normalize_column(current) != self.dialect.normalize_column(desired) {
                script.push(
                    Operation::ModifyColumn {
                        table: pair.forward_name().to_string(),
                        column: desired.clone(),
                    },
                    Operation::ModifyColumn {
                        table: pair.reverse_name().to_string(),
                        column: current.clone(),
                    },
                );
            }
        }
    }

    fn drop_columns(pair: &Pair<'_>, script: &mut Script) {
        for column in diffable(&pair.current.fields) {
            if !pair.desired.has_column(&column.name) {
                script.push(
                    Operation::DropColumn {
                        table: pair.forward_name().to_string(),
                        column: column.name.clone(),
                    },
                    Operation::AddColumn {
                        table: pair.reverse_name().to_string(),
                        column: column.clone(),
                    },
                );
            }
        }
    }
}

/// Columns that take part in column-level diffs.
fn diffable(fields: &[Column]) -> impl Iterator<Item = &Column> {
    fields.iter().filter(|c| c.name != ID_COLUMN)
}
