//! CLI commands

pub mod check;
pub mod completions;
pub mod config;
pub mod logs;
pub mod refresh;
pub mod status;
pub mod unlock;
pub mod watch;

use clap::Subcommand;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one scheduler tick (cron entry point)
    Refresh(refresh::RefreshArgs),

    /// Tick periodically until interrupted
    Watch(watch::WatchArgs),

    /// Check an email address against the blocklist
    Check(check::CheckArgs),

    /// Show blocklist metadata and lock state
    Status,

    /// Clear a stuck refresh lock
    Unlock,

    /// Blocked-attempt log management
    Logs(logs::LogsArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}
