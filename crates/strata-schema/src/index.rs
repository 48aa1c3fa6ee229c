//! Index definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// The table's primary key. A table has at most one.
    PrimaryKey,
    /// A unique index.
    Unique,
    /// A plain, non-unique index.
    Index,
}

impl IndexKind {
    /// The suffix used when naming an index of this kind.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::PrimaryKey => "primary",
            Self::Unique => "unique",
            Self::Index => "index",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryKey => f.write_str("PRIMARY KEY"),
            Self::Unique => f.write_str("UNIQUE"),
            Self::Index => f.write_str("INDEX"),
        }
    }
}

/// A single-column index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    /// The indexed column.
    pub field: String,
    /// The kind of index.
    pub kind: IndexKind,
}

impl Index {
    pub fn new(field: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }

    pub fn primary(field: impl Into<String>) -> Self {
        Self::new(field, IndexKind::PrimaryKey)
    }

    pub fn unique(field: impl Into<String>) -> Self {
        Self::new(field, IndexKind::Unique)
    }

    pub fn index(field: impl Into<String>) -> Self {
        Self::new(field, IndexKind::Index)
    }

    /// Returns `true` if this is the table's primary key.
    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::PrimaryKey
    }

    /// The database name of this index on `table`: `<table>_<field>_<kind>`.
    pub fn name(&self, table: &str) -> String {
        index_name(table, &self.field, self.kind)
    }
}

/// Builds the name of the index of `kind` on `table.field`.
pub fn index_name(table: &str, field: &str, kind: IndexKind) -> String {
    format!("{table}_{field}_{}", kind.suffix())
}
