use std::process::ExitCode;

use strata_cli::commands::register_builtin_commands;
use strata_cli::{load_settings, CommandRegistry};
use strata_core::logging::setup_logging;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);

    let matches = registry.build_cli().get_matches();
    let settings = load_settings(&matches)?;
    setup_logging(&settings);

    registry.execute(&matches, &settings).await?;
    Ok(())
}
