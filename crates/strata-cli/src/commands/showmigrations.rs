//! The `showmigrations` management command.

use async_trait::async_trait;
use strata_core::{Settings, StrataResult};
use strata_migrations::{MigrationRunner, MigrationStatus};

use crate::command::ManagementCommand;

/// Lists all migrations and whether they are applied.
pub struct ShowmigrationsCommand;

/// Formats one status line, e.g. `[X] 0002  (applied 2024-05-01 12:30:00)`.
pub fn status_line(status: &MigrationStatus) -> String {
    match status.applied_at {
        Some(at) => format!("[X] {}  (applied {})", status.name, at.format("%Y-%m-%d %H:%M:%S")),
        None => format!("[ ] {}", status.name),
    }
}

#[async_trait]
impl ManagementCommand for ShowmigrationsCommand {
    fn name(&self) -> &'static str {
        "showmigrations"
    }

    fn help(&self) -> &'static str {
        "Show migration status"
    }

    async fn handle(&self, _matches: &clap::ArgMatches, settings: &Settings) -> StrataResult<()> {
        let runner = MigrationRunner::from_settings(settings)?;
        let migrations = runner.list_migrations().await?;
        if migrations.is_empty() {
            println!("No migrations");
        }
        for status in &migrations {
            println!("{}", status_line(status));
        }
        Ok(())
    }
}
