//! Settings for strata.
//!
//! [`Settings`] is a plain value that is built once (see
//! [`settings_loader`](crate::settings_loader)) and passed explicitly to
//! whatever needs it. There is no global settings instance.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StrataError;

/// The database engine a migration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// `SQLite`. Most column and constraint changes require a table rebuild.
    Sqlite,
    /// `MySQL` / `MariaDB`. Supports in-place `ALTER TABLE`.
    Mysql,
}

impl Engine {
    /// Returns the lowercase engine name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Mysql => "mysql",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            other => Err(StrataError::ConfigurationError(format!(
                "Unknown database engine '{other}'"
            ))),
        }
    }
}

/// Connection settings for the target database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The database engine.
    pub engine: Engine,
    /// The database name (or file path for `SQLite`).
    pub name: String,
    /// The database user.
    pub user: String,
    /// The database password.
    pub password: String,
    /// The database host.
    pub host: String,
    /// The database port.
    pub port: u16,
    /// Additional engine-specific options.
    pub options: HashMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: Engine::Sqlite,
            name: "db.sqlite3".to_string(),
            user: String::new(),
            password: String::new(),
            host: String::new(),
            port: 0,
            options: HashMap::new(),
        }
    }
}

/// Where migration artifacts live and which table records their history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSettings {
    /// Directory holding `<name>.json` migration artifacts.
    pub dir: PathBuf,
    /// Name of the migration history table.
    pub history_table: String,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("migrations"),
            history_table: "strata_migrations".to_string(),
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Enables human-readable log output.
    pub debug: bool,
    /// Tracing filter directive (e.g. "info", "strata_migrations=debug").
    pub log_level: String,

    // ── Database ─────────────────────────────────────────────────────

    /// The target database.
    pub database: DatabaseSettings,

    // ── Migrations ───────────────────────────────────────────────────

    /// Migration artifact storage.
    pub migrations: MigrationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            database: DatabaseSettings::default(),
            migrations: MigrationSettings::default(),
        }
    }
}
