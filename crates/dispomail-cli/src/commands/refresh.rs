//! Refresh command - one scheduler tick

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use dispomail_core::TickOutcome;
use std::path::Path;

use crate::context::{format_time, AppContext};

/// Refresh command arguments
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Refresh even if the cached list is still fresh
    #[arg(short, long)]
    pub force: bool,
}

/// Execute refresh command
pub fn execute(args: RefreshArgs, config: Option<&Path>) -> Result<()> {
    let ctx = AppContext::load(config)?;
    let scheduler = ctx.scheduler()?;

    let outcome = if args.force {
        scheduler.refresh_now()
    } else {
        scheduler.tick()
    };

    print_outcome(&outcome);

    if let TickOutcome::Failed(reason) = outcome {
        bail!("Refresh failed: {reason}");
    }
    Ok(())
}

/// Print a tick outcome in one line
pub fn print_outcome(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Refreshed(metadata) => println!(
            "{} Stored {} entries in {} chunks (generation {})",
            "✓".green(),
            metadata.entry_count.to_string().cyan(),
            metadata.chunk_count,
            metadata.generation
        ),
        TickOutcome::NotDue { next_due } => println!(
            "{} Blocklist is fresh, next refresh due {}",
            "•".bright_blue(),
            format_time(*next_due)
        ),
        TickOutcome::Disabled => println!("{} Refresh task is disabled", "•".dimmed()),
        TickOutcome::InProgress | TickOutcome::Locked => {
            println!("{} Another refresh is running, skipped", "!".yellow());
        }
        TickOutcome::NoData => println!(
            "{} Provider returned no data, keeping the cached list",
            "!".yellow()
        ),
        TickOutcome::Failed(reason) => println!("{} {}", "✗".red(), reason),
    }
}
