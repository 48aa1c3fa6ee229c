//! # strata-schema
//!
//! The dialect-neutral schema data model. Everything here is a plain value:
//! a [`Table`] never changes in place, and applying an [`Operation`] to a
//! [`SchemaState`] returns a new state.
//!
//! ## Modules
//!
//! - [`value`] - Literal values used for defaults and query parameters
//! - [`column`] - Column definitions, types, sizes, and defaults
//! - [`index`] - Primary key, unique, and plain indexes
//! - [`foreign_key`] - Foreign key constraints
//! - [`table`] - Table snapshots
//! - [`operation`] - Structural schema operations
//! - [`state`] - Replaying operations against a list of tables
//! - [`model`] - Declared models and conversion into desired tables

pub mod column;
pub mod foreign_key;
pub mod index;
pub mod model;
pub mod operation;
pub mod state;
pub mod table;
pub mod value;

pub use column::{Column, ColumnDefault, ColumnSize, ColumnType, Generators};
pub use foreign_key::{ForeignKey, OnDelete};
pub use index::{Index, IndexKind};
pub use model::{FieldDescriptor, ModelDescriptor, ModelRegistry, Relation};
pub use operation::Operation;
pub use state::SchemaState;
pub use table::Table;
pub use value::Value;

/// Name of the implicit auto-increment primary key column.
pub const ID_COLUMN: &str = "id";
