//! The `rollback` management command.

use async_trait::async_trait;
use strata_core::{Settings, StrataResult};
use strata_migrations::{Direction, MigrationRunner};

use crate::command::ManagementCommand;

/// Reverts applied migrations, newest first.
pub struct RollbackCommand;

#[async_trait]
impl ManagementCommand for RollbackCommand {
    fn name(&self) -> &'static str {
        "rollback"
    }

    fn help(&self) -> &'static str {
        "Roll back the latest migration, or every migration down to a named one"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("migration_name")
                .help("Roll back every applied migration down to and including this one")
                .required(false),
        )
        .arg(
            clap::Arg::new("sql")
                .long("sql")
                .action(clap::ArgAction::SetTrue)
                .requires("migration_name")
                .help("Print the reverse SQL of the named migration without running it"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> StrataResult<()> {
        let target = matches.get_one::<String>("migration_name").map(String::as_str);
        let runner = MigrationRunner::from_settings(settings)?;

        if let (true, Some(name)) = (matches.get_flag("sql"), target) {
            for statement in runner.sql_for(name, Direction::Reverse).await? {
                println!("{statement};");
            }
            return Ok(());
        }

        let reverted = runner.rollback(target).await?;
        if reverted.is_empty() {
            println!("No migrations to roll back");
        }
        for name in reverted {
            println!("Rolled back {name}");
        }
        Ok(())
    }
}
