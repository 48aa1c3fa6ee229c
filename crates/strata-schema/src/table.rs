//! Table snapshots.
//!
//! A [`Table`] is an immutable snapshot: the `with_*`/`without_*` helpers
//! return a new value and leave the original untouched.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use strata_core::{StrataError, StrataResult};

use crate::column::Column;
use crate::foreign_key::ForeignKey;
use crate::index::{Index, IndexKind};
use crate::ID_COLUMN;

/// A table: ordered columns plus its indexes and foreign keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// The table name.
    pub name: String,
    /// The pre-rename name, set only while a rename is in flight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,
    /// Columns in declaration order.
    pub fields: Vec<Column>,
    /// Indexes, including the primary key.
    #[serde(default)]
    pub indexes: Vec<Index>,
    /// Foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Creates an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_name: None,
            fields: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Creates a table that starts with the implicit `id` primary key.
    pub fn with_id(name: impl Into<String>) -> Self {
        Self::new(name)
            .with_column(Column::implicit_id())
            .with_index(Index::primary(ID_COLUMN))
    }

    // ── Lookups ──────────────────────────────────────────────────────

    /// Returns `true` if `name` is this table's name or its pre-rename name.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.old_name.as_deref() == Some(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.fields.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns the index on `field` of the given kind.
    pub fn index(&self, field: &str, kind: IndexKind) -> Option<&Index> {
        self.indexes
            .iter()
            .find(|i| i.field == field && i.kind == kind)
    }

    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.is_primary())
    }

    /// Returns `true` if the primary key is the implicit `id` column.
    pub fn has_implicit_primary_key(&self) -> bool {
        self.primary_key().is_some_and(|pk| pk.field == ID_COLUMN)
    }

    pub fn foreign_key(&self, field: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.field == field)
    }

    /// The unordered set of column names, excluding `id`.
    ///
    /// This is the structural identity used to detect renamed tables.
    pub fn column_name_set(&self) -> BTreeSet<&str> {
        self.fields
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| *name != ID_COLUMN)
            .collect()
    }

    /// Column definitions in order, excluding `id`, with the names blanked.
    ///
    /// Equal signatures mean two tables differ in column names only.
    pub fn type_signature(&self) -> Vec<Column> {
        self.fields
            .iter()
            .filter(|c| c.name != ID_COLUMN)
            .map(|c| Column {
                name: String::new(),
                ..c.clone()
            })
            .collect()
    }

    /// Tables referenced by foreign keys, excluding self-references.
    pub fn parents(&self) -> Vec<&str> {
        let mut parents: Vec<&str> = Vec::new();
        for fk in &self.foreign_keys {
            if !fk.is_self_reference(&self.name) && !parents.contains(&fk.ref_table.as_str()) {
                parents.push(&fk.ref_table);
            }
        }
        parents
    }

    // ── Immutable updates ────────────────────────────────────────────

    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.fields.push(column);
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Returns a copy without `old_name`.
    #[must_use]
    pub fn settled(&self) -> Self {
        Self {
            old_name: None,
            ..self.clone()
        }
    }

    /// Returns the column names present in both tables, in `self`'s order.
    pub fn common_columns<'a>(&'a self, other: &Self) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|c| other.has_column(&c.name))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Compares name, columns, indexes, and foreign keys, ignoring their
    /// order and any pending rename.
    pub fn same_shape(&self, other: &Self) -> bool {
        fn same<T: PartialEq>(a: &[T], b: &[T]) -> bool {
            a.len() == b.len() && a.iter().all(|x| b.contains(x))
        }
        self.name == other.name
            && same(&self.fields, &other.fields)
            && same(&self.indexes, &other.indexes)
            && same(&self.foreign_keys, &other.foreign_keys)
    }

    /// Checks the table's structural invariants.
    pub fn validate(&self) -> StrataResult<()> {
        if self.name.trim().is_empty() {
            return Err(StrataError::InvalidSchema("table name is empty".into()));
        }
        let mut seen = HashSet::new();
        for column in &self.fields {
            column
                .validate()
                .map_err(|e| StrataError::InvalidSchema(format!("{}: {e}", self.name)))?;
            if !seen.insert(column.name.as_str()) {
                return Err(StrataError::InvalidSchema(format!(
                    "table '{}' declares column '{}' twice",
                    self.name, column.name
                )));
            }
        }
        if self.indexes.iter().filter(|i| i.is_primary()).count() > 1 {
            return Err(StrataError::InvalidSchema(format!(
                "table '{}' has more than one primary key",
                self.name
            )));
        }
        for index in &self.indexes {
            if !self.has_column(&index.field) {
                return Err(StrataError::InvalidSchema(format!(
                    "index on '{}.{}' names a missing column",
                    self.name, index.field
                )));
            }
        }
        for fk in &self.foreign_keys {
            if !self.has_column(&fk.field) {
                return Err(StrataError::InvalidSchema(format!(
                    "foreign key on '{}.{}' names a missing column",
                    self.name, fk.field
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;

    fn posts() -> Table {
        Table::with_id("posts")
            .with_column(Column::varchar("title", 200))
            .with_column(Column::foreign_id("author_id"))
            .with_column(Column::foreign_id("parent_id").nullable())
            .with_foreign_key(ForeignKey::new("author_id", "users"))
            .with_foreign_key(ForeignKey::new("parent_id", "posts"))
    }

    #[test]
    fn test_column_name_set_excludes_id() {
        let table = posts();
        let names: Vec<&str> = table.column_name_set().into_iter().collect();
        assert_eq!(names, vec!["author_id", "parent_id", "title"]);
    }

    #[test]
    fn test_parents_exclude_self_reference() {
        assert_eq!(posts().parents(), vec!["users"]);
    }

    #[test]
    fn test_same_shape_ignores_column_order() {
        let reordered = Table::with_id("posts")
            .with_column(Column::foreign_id("parent_id").nullable())
            .with_column(Column::varchar("title", 200))
            .with_column(Column::foreign_id("author_id"))
            .with_foreign_key(ForeignKey::new("parent_id", "posts"))
            .with_foreign_key(ForeignKey::new("author_id", "users"));
        assert!(posts().same_shape(&reordered));
        assert!(!posts().same_shape(&reordered.with_index(Index::index("title"))));
    }

    #[test]
    fn test_implicit_primary_key() {
        assert!(posts().has_implicit_primary_key());
        let keyed = Table::new("codes")
            .with_column(Column::varchar("code", 8))
            .with_index(Index::primary("code"));
        assert!(!keyed.has_implicit_primary_key());
    }

    #[test]
    fn test_answers_to_old_name() {
        let mut table = posts();
        table.old_name = Some("articles".into());
        assert!(table.answers_to("articles"));
        assert!(table.answers_to("posts"));
        assert!(!table.settled().answers_to("articles"));
    }

    #[test]
    fn test_common_columns() {
        let narrow = Table::with_id("posts").with_column(Column::varchar("title", 200));
        assert_eq!(posts().common_columns(&narrow), vec!["id", "title"]);
    }

    #[test]
    fn test_validate_ok() {
        assert!(posts().validate().is_ok());
    }

    #[test]
    fn test_validate_two_primary_keys() {
        let table = posts().with_index(Index::primary("title"));
        assert!(matches!(table.validate(), Err(StrataError::InvalidSchema(_))));
    }

    #[test]
    fn test_validate_foreign_key_field_missing() {
        let table = posts().with_foreign_key(ForeignKey::new("editor_id", "users"));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_column() {
        let table = posts().with_column(Column::new("title", ColumnType::Text));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_old_name_not_serialized() {
        let json = serde_json::to_value(posts()).unwrap();
        assert!(json.get("old_name").is_none());
    }
}
