//! Logs command - blocked-attempt log management

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use dispomail_core::audit::{AuditAction, AuditLog, AuditQuery, SortOrder, MAX_STAT_DAYS};
use std::net::IpAddr;
use std::path::Path;
use tracing::info;

use crate::context::{format_time, AppContext};

/// Logs command arguments
#[derive(Args, Debug)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub command: LogsCommand,
}

/// Logs subcommands
#[derive(Subcommand, Debug)]
pub enum LogsCommand {
    /// List blocked attempts, newest first
    List {
        /// Only attempts from this client address
        #[arg(long, value_name = "IP")]
        ip: Option<IpAddr>,

        /// Only emails containing this text
        #[arg(long)]
        email: Option<String>,

        /// Only this kind of attempt (login or register)
        #[arg(long)]
        action: Option<AuditAction>,

        /// Page number
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Oldest first
        #[arg(long)]
        oldest_first: bool,
    },

    /// Delete every entry
    Purge,

    /// Delete the given entries
    Delete {
        /// Entry ids
        #[arg(required = true)]
        ids: Vec<u64>,
    },

    /// Blocked attempts per day
    Stats {
        /// Only this kind of attempt (login or register)
        #[arg(long)]
        action: Option<AuditAction>,

        /// Number of most recent days to show
        #[arg(long, default_value_t = MAX_STAT_DAYS)]
        days: usize,
    },
}

/// Execute logs command
pub fn execute(args: LogsArgs, config: Option<&Path>) -> Result<()> {
    let ctx = AppContext::load(config)?;
    let log = ctx.audit_log()?;

    match args.command {
        LogsCommand::List {
            ip,
            email,
            action,
            page,
            oldest_first,
        } => {
            let query = AuditQuery {
                ip,
                email,
                action,
                order: if oldest_first {
                    SortOrder::OldestFirst
                } else {
                    SortOrder::NewestFirst
                },
                per_page: ctx.config.audit.per_page,
            };
            list(&log, &query, page)
        }
        LogsCommand::Purge => {
            let removed = log.delete_all().context("Failed to purge audit log")?;
            info!(removed, "Purged audit log");
            println!("{} Deleted {} entries", "✓".green(), removed);
            Ok(())
        }
        LogsCommand::Delete { ids } => {
            let removed = log.delete(&ids).context("Failed to delete audit entries")?;
            info!(removed, "Deleted audit entries");
            println!("{} Deleted {} of {} entries", "✓".green(), removed, ids.len());
            Ok(())
        }
        LogsCommand::Stats { action, days } => stats(&log, action, days),
    }
}

fn list(log: &impl AuditLog, query: &AuditQuery, page: usize) -> Result<()> {
    let page = log.query(query, page).context("Failed to read audit log")?;

    println!("{}", "═".repeat(72).bright_blue());
    println!(
        "{:>6}  {:<32} {:<16} {:<9} {}",
        "ID", "EMAIL", "IP", "ACTION", "WHEN"
    );
    println!("{}", "─".repeat(72).bright_black());

    if page.entries.is_empty() {
        println!("{}", "  (no entries)".dimmed());
    }
    for entry in &page.entries {
        let ip = entry
            .source_ip
            .map_or_else(|| "-".to_string(), |ip| ip.to_string());
        println!(
            "{:>6}  {:<32} {:<16} {:<9} {}",
            entry.id,
            entry.email,
            ip,
            entry.action.to_string(),
            format_time(entry.timestamp)
        );
    }

    println!("{}", "═".repeat(72).bright_blue());
    println!(
        "Page {} of {} ({} entries)",
        page.page,
        page.pages.max(1),
        page.total
    );
    Ok(())
}

fn stats(log: &impl AuditLog, action: Option<AuditAction>, days: usize) -> Result<()> {
    let counts = log
        .daily_counts(action, days)
        .context("Failed to read audit log")?;

    let label = action.map_or_else(|| "all".to_string(), |a| a.to_string());
    println!("Blocked attempts per day ({label})");
    println!("{}", "─".repeat(40).bright_black());

    if counts.is_empty() {
        println!("{}", "  (no entries)".dimmed());
    }
    let max = counts.iter().map(|c| c.count).max().unwrap_or(1).max(1);
    for day in &counts {
        let width = usize::try_from(day.count * 30 / max).unwrap_or(30).max(1);
        println!(
            "{}  {:>6}  {}",
            day.day.format("%Y-%m-%d"),
            day.count,
            "▇".repeat(width).cyan()
        );
    }
    Ok(())
}
