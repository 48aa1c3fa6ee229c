//! # strata-backends
//!
//! Database backends for strata. Each backend executes statements, runs
//! queries for the migration history table, controls transactions, and
//! introspects the live schema.
//!
//! Supported backends (behind cargo features):
//! - `SQLite` (`sqlite`, on by default)
//! - `MySQL` (`mysql`)

pub mod base;
pub mod row;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use strata_core::settings::{DatabaseSettings, Engine};
use strata_core::{StrataError, StrataResult};

pub use base::DatabaseBackend;
pub use row::{FromValue, Row};

#[cfg(feature = "mysql")]
pub use mysql::MySqlBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

/// A shared, dynamically chosen backend.
pub type SharedBackend = Arc<dyn DatabaseBackend>;

/// Opens the backend described by `settings`.
///
/// Returns [`StrataError::ConfigurationError`] if the engine's cargo feature
/// is not enabled.
pub fn connect(settings: &DatabaseSettings) -> StrataResult<SharedBackend> {
    tracing::debug!(engine = %settings.engine, name = %settings.name, "Connecting");
    match settings.engine {
        #[cfg(feature = "sqlite")]
        Engine::Sqlite => Ok(Arc::new(SqliteBackend::open(&settings.name)?)),
        #[cfg(feature = "mysql")]
        Engine::Mysql => Ok(Arc::new(MySqlBackend::from_settings(settings)?)),
        #[allow(unreachable_patterns)]
        other => Err(StrataError::ConfigurationError(format!(
            "the '{other}' backend is not enabled in this build"
        ))),
    }
}
