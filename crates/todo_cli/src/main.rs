//! Terminal front end for the todo manager.
//!
//! # Responsibility
//! - Parse arguments, bootstrap logging and configuration.
//! - Route each subcommand to the core services.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::error;
use todo_core::{default_log_level, init_logging, CoreConfig};

mod cli;
mod commands;

use crate::cli::{Cli, Command};
use crate::commands::{App, CliError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli
            .log_level
            .map_or_else(default_log_level, |level| level.as_str());
        if let Err(err) = init_logging(level, absolute(log_dir)) {
            eprintln!("error: failed to initialize logging: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match cli.config.as_deref() {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    let app = App::open(&cli.db, config, cli.yes)?;

    match cli.command {
        Command::Add(args) => app.add(args)?,
        Command::List(args) => app.list(args)?,
        Command::Show(args) => app.show(&args.id)?,
        Command::Edit(args) => app.edit(args)?,
        Command::Toggle(args) => app.toggle(&args.id)?,
        Command::Delete(args) => app.delete(&args.id).await?,
        Command::Move(args) => app.move_to(args)?,
        Command::ClearCompleted => app.clear_completed().await?,
        Command::CompleteAll => app.complete_all(),
        Command::ReopenAll => app.reopen_all(),
        Command::Stats => app.stats(),
        Command::Export(args) => app.export(args)?,
        Command::Import(args) => app.import(args).await?,
        Command::Sample => app.sample()?,
        Command::Remind(args) => app.remind(args).await?,
    }

    app.finish()
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
