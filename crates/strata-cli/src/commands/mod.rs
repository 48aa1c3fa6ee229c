//! Built-in management commands.
//!
//! Each command implements the
//! [`ManagementCommand`](crate::command::ManagementCommand) trait and talks
//! to the database through a [`MigrationRunner`](strata_migrations::MigrationRunner)
//! built from the loaded settings.

pub mod makemigrations;
pub mod migrate;
pub mod rollback;
pub mod showmigrations;

pub use makemigrations::MakemigrationsCommand;
pub use migrate::MigrateCommand;
pub use rollback::RollbackCommand;
pub use showmigrations::ShowmigrationsCommand;

use crate::command::CommandRegistry;

/// Registers all built-in management commands into the given registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(MakemigrationsCommand));
    registry.register(Box::new(MigrateCommand));
    registry.register(Box::new(RollbackCommand));
    registry.register(Box::new(ShowmigrationsCommand));
}
