//! Foreign key constraints.

use serde::{Deserialize, Serialize};

use crate::ID_COLUMN;

/// Behavior when a referenced row is deleted (`ON DELETE` action).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    /// Prevent deletion while referencing rows exist.
    #[default]
    Restrict,
    /// Delete referencing rows too.
    Cascade,
    /// Set the referencing column to NULL.
    SetNull,
}

impl OnDelete {
    /// The SQL keyword(s) for this action.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
        }
    }

    /// Parses the action as reported by a database.
    pub fn from_sql(action: &str) -> Self {
        match action.trim().to_uppercase().as_str() {
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            _ => Self::Restrict,
        }
    }
}

/// A single-column foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// The referencing column on the owning table.
    pub field: String,
    /// The referenced table.
    pub ref_table: String,
    /// The referenced column.
    pub ref_field: String,
    /// The `ON DELETE` action.
    #[serde(default)]
    pub on_delete: OnDelete,
}

impl ForeignKey {
    /// Creates a foreign key referencing `ref_table.id` with `ON DELETE RESTRICT`.
    pub fn new(field: impl Into<String>, ref_table: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ref_table: ref_table.into(),
            ref_field: ID_COLUMN.to_string(),
            on_delete: OnDelete::Restrict,
        }
    }

    #[must_use]
    pub fn references(mut self, ref_field: impl Into<String>) -> Self {
        self.ref_field = ref_field.into();
        self
    }

    #[must_use]
    pub const fn on_delete(mut self, on_delete: OnDelete) -> Self {
        self.on_delete = on_delete;
        self
    }

    /// The constraint name on `table`: `<table>_<field>_foreign`.
    pub fn name(&self, table: &str) -> String {
        foreign_key_name(table, &self.field)
    }

    /// Returns `true` if this key points back at its own table.
    pub fn is_self_reference(&self, table: &str) -> bool {
        self.ref_table == table
    }
}

/// Builds the constraint name of the foreign key on `table.field`.
pub fn foreign_key_name(table: &str, field: &str) -> String {
    format!("{table}_{field}_foreign")
}
