//! # strata-core
//!
//! Error types, settings, and logging shared by every strata crate.
//! This crate has no database dependencies.
//!
//! ## Modules
//!
//! - [`error`] - The error taxonomy and result alias
//! - [`settings`] - Engine, database, and migration-directory settings
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{StrataError, StrataResult};
pub use settings::{DatabaseSettings, Engine, MigrationSettings, Settings};
