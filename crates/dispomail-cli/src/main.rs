//! dispomail CLI
//!
//! Command-line host for the disposable email blocklist engine.

mod args;
mod commands;
mod context;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use args::Args;
use commands::Command;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init(&args)?;

    let result = run(args);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn run(args: Args) -> Result<()> {
    let config = args.config.as_deref();

    match args.command {
        Command::Refresh(refresh_args) => commands::refresh::execute(refresh_args, config),
        Command::Watch(watch_args) => commands::watch::execute(watch_args, config),
        Command::Check(check_args) => commands::check::execute(check_args, config),
        Command::Status => commands::status::execute(config),
        Command::Unlock => commands::unlock::execute(config),
        Command::Logs(logs_args) => commands::logs::execute(logs_args, config),
        Command::Config(config_args) => commands::config::execute(config_args, config),
        Command::Completions(comp_args) => commands::completions::execute(comp_args),
    }
}
