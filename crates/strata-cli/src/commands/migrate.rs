//! The `migrate` management command.
//!
//! Applies the latest pending migration, or every pending migration up to a
//! named one. With `--sql` the rendered statements are printed instead.

use async_trait::async_trait;
use strata_core::{Settings, StrataResult};
use strata_migrations::{Direction, MigrationRunner};

use crate::command::ManagementCommand;

/// Applies database migrations.
pub struct MigrateCommand;

#[async_trait]
impl ManagementCommand for MigrateCommand {
    fn name(&self) -> &'static str {
        "migrate"
    }

    fn help(&self) -> &'static str {
        "Apply database migrations"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("migration_name")
                .help("Apply every pending migration up to this one")
                .required(false),
        )
        .arg(
            clap::Arg::new("sql")
                .long("sql")
                .action(clap::ArgAction::SetTrue)
                .requires("migration_name")
                .help("Print the forward SQL of the named migration without running it"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> StrataResult<()> {
        let target = matches.get_one::<String>("migration_name").map(String::as_str);
        let runner = MigrationRunner::from_settings(settings)?;

        if let (true, Some(name)) = (matches.get_flag("sql"), target) {
            for statement in runner.sql_for(name, Direction::Forward).await? {
                println!("{statement};");
            }
            return Ok(());
        }

        let applied = runner.migrate(target).await?;
        if applied.is_empty() {
            println!("No migrations to apply");
        }
        for name in applied {
            println!("Applied {name}");
        }
        Ok(())
    }
}
