use anyhow::Result;
use clap::CommandFactory;
use flurry::commands::{self, run, status, stop};
use std::io;

use super::types::{Cli, Commands};

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            watch,
            duration,
            headless,
        } => run::execute(run::RunOptions {
            watch,
            duration_secs: duration,
            config: cli.config,
            headless,
        }),
        Commands::Status { json } => {
            let lock_path = commands::resolve_lock_path(cli.config.as_deref())?;
            status::execute(&lock_path, json)
        }
        Commands::Stop => {
            let lock_path = commands::resolve_lock_path(cli.config.as_deref())?;
            stop::execute(&lock_path)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "flurry", &mut io::stdout());
            Ok(())
        }
    }
}
