//! # strata
//!
//! A schema migration engine: declared models are diffed against the schema
//! the migration history describes, and the difference is stored as a
//! reversible migration and applied as dialect-correct DDL.
//!
//! This is the meta-crate that re-exports the member crates. Depend on
//! `strata` to get everything, or on individual crates for finer-grained
//! control.
//!
//! ```rust,no_run
//! use strata::migrations::MigrationRunner;
//! use strata::schema::ModelRegistry;
//!
//! # async fn run() -> strata::core::StrataResult<()> {
//! let settings = strata::core::settings_loader::from_env();
//! let runner = MigrationRunner::from_settings(&settings)?;
//! let registry = ModelRegistry::from_file("models.toml")?;
//! if runner.make_migration(&registry).await?.is_some() {
//!     runner.migrate(None).await?;
//! }
//! # Ok(())
//! # }
//! ```

/// Error types, settings, and logging.
pub use strata_core as core;

/// The dialect-neutral schema model and declared models.
pub use strata_schema as schema;

/// SQL dialect engines.
pub use strata_dialects as dialects;

/// Database backends: `SQLite`, `MySQL`.
pub use strata_backends as backends;

/// State replay, diffing, artifacts, and the migration runner.
#[cfg(feature = "migrations")]
pub use strata_migrations as migrations;

/// Management commands (CLI).
#[cfg(feature = "cli")]
pub use strata_cli as cli;

pub use strata_core::{Settings, StrataError, StrataResult};
