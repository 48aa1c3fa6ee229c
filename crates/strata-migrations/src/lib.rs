//! # strata-migrations
//!
//! The migration engine: reconstructing the current schema from history,
//! diffing it against declared tables, persisting the result as migration
//! artifacts, and applying or rolling them back.
//!
//! ## Architecture
//!
//! - [`StateBuilder`] replays recorded migrations into a [`SchemaState`].
//! - [`TableComparer`] diffs current and desired tables into forward and
//!   reverse operation lists.
//! - [`sort_for_creation`] orders new tables so that parents come first.
//! - [`Migration`] is the artifact; [`MigrationLoader`] reads them back.
//! - [`MigrationRecorder`] owns the history table.
//! - [`MigrationRunner`] renders and executes scripts transactionally.
//!
//! ## Module Overview
//!
//! - [`artifact`] - `Migration`, `Direction`
//! - [`comparer`] - `TableComparer`, `Changes`
//! - [`executor`] - `MigrationRunner`, `MigrationStatus`
//! - [`loader`] - `MigrationLoader` for filesystem discovery
//! - [`recorder`] - `MigrationRecorder`, `HistoryRow`
//! - [`splitter`] - quote- and comment-aware statement splitting
//! - [`state`] - `StateBuilder`
//! - [`topology`] - creation-order sort for new tables
//!
//! [`SchemaState`]: strata_schema::SchemaState

#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]

pub mod artifact;
pub mod comparer;
pub mod executor;
pub mod loader;
pub mod recorder;
pub mod splitter;
pub mod state;
pub mod topology;

// Re-export key types at the crate root.
pub use artifact::{Direction, Migration};
pub use comparer::{Changes, TableComparer};
pub use executor::{MigrationRunner, MigrationStatus};
pub use loader::MigrationLoader;
pub use recorder::{HistoryRow, MigrationRecorder};
pub use splitter::split_statements;
pub use state::StateBuilder;
pub use topology::sort_for_creation;
