//! Status command - blocklist metadata and lock state

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::context::{format_time, store_dir, AppContext};

/// Execute status command
pub fn execute(config: Option<&Path>) -> Result<()> {
    let ctx = AppContext::load(config)?;
    let scheduler = ctx.scheduler()?;
    let status = scheduler.status();

    println!("{}", "═".repeat(50).bright_blue());
    println!("{}", " dispomail status".bright_white().bold());
    println!("{}", "═".repeat(50).bright_blue());

    if let Some(ref path) = ctx.config_path {
        println!("Config:        {}", path.display());
    } else {
        println!("Config:        {}", "(defaults)".dimmed());
    }
    println!("Cache:         {}", store_dir(&ctx.config).display());

    let enabled = if status.enabled {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("Refresh task:  {enabled}");

    match status.provider {
        Some(provider) => println!("Provider:      {} ({})", provider.label(), provider.id()),
        None => println!("Provider:      {}", "unknown".red()),
    }
    println!("{}", "─".repeat(50).bright_black());

    match status.metadata {
        Some(metadata) => {
            println!("Entries:       {}", metadata.entry_count.to_string().cyan());
            println!("Chunks:        {}", metadata.chunk_count);
            println!("Generation:    {}", metadata.generation);
            println!("Last refresh:  {}", format_time(metadata.last_refresh_time));
        }
        None => println!("Entries:       {}", "never refreshed".yellow()),
    }

    match status.next_due {
        Some(next) if !status.due => println!("Next refresh:  {}", format_time(next)),
        _ => println!("Next refresh:  {}", "due now".yellow()),
    }

    match status.lock {
        Some(lock) if status.lock_held => println!(
            "Lock:          {} since {}",
            "held".yellow(),
            format_time(lock.acquired_at)
        ),
        Some(lock) => println!(
            "Lock:          {} (taken {}, lease expired)",
            "stale".red(),
            format_time(lock.acquired_at)
        ),
        None => println!("Lock:          {}", "free".green()),
    }

    println!("{}", "═".repeat(50).bright_blue());
    Ok(())
}
