//! The `makemigrations` management command.
//!
//! Loads the declared models from a JSON or TOML models file, compares them
//! against the schema the migration history describes, and writes a new
//! migration artifact for the difference.

use async_trait::async_trait;
use strata_core::{Settings, StrataResult};
use strata_migrations::MigrationRunner;
use strata_schema::ModelRegistry;

use crate::command::ManagementCommand;

/// Creates a migration from model changes.
pub struct MakemigrationsCommand;

#[async_trait]
impl ManagementCommand for MakemigrationsCommand {
    fn name(&self) -> &'static str {
        "makemigrations"
    }

    fn help(&self) -> &'static str {
        "Create a migration for changes to the declared models"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("models")
                .long("models")
                .default_value("models.toml")
                .help("Path to the models file (.toml or .json)"),
        )
        .arg(
            clap::Arg::new("dry-run")
                .long("dry-run")
                .action(clap::ArgAction::SetTrue)
                .help("Print the detected operations without writing a migration"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> StrataResult<()> {
        let models = matches
            .get_one::<String>("models")
            .map_or("models.toml", String::as_str);
        let registry = ModelRegistry::from_file(models)?;
        tracing::info!(models, count = registry.models().len(), "Loaded models");

        let runner = MigrationRunner::from_settings(settings)?;

        if matches.get_flag("dry-run") {
            let changes = runner.compare(&registry.tables()?).await?;
            if changes.is_empty() {
                println!("No changes detected");
            }
            for op in &changes.forward {
                println!("  - {}", op.describe());
            }
            return Ok(());
        }

        match runner.make_migration(&registry).await? {
            Some(migration) => {
                println!("Migration {}:", migration.name);
                for op in &migration.forward {
                    println!("  - {}", op.describe());
                }
            }
            None => println!("No changes detected"),
        }
        Ok(())
    }
}
