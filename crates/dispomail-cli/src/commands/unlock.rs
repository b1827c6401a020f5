//! Unlock command - clear a stuck refresh lock

use anyhow::{Context, Result};
use colored::Colorize;
use dispomail_core::refresh::RefreshLock;
use std::path::Path;
use tracing::warn;

use crate::context::{format_time, AppContext};

/// Execute unlock command
pub fn execute(config: Option<&Path>) -> Result<()> {
    let ctx = AppContext::load(config)?;
    let lock = RefreshLock::new(&ctx.config.store.key_prefix, ctx.config.refresh.lock_lease_secs);
    let store = ctx.store().as_ref();

    let Some(record) = lock.current(store) else {
        println!("{} Refresh lock is not held", "•".dimmed());
        return Ok(());
    };

    lock.force_release(store).context("Failed to remove refresh lock")?;
    warn!(acquired_at = record.acquired_at, "Refresh lock removed by operator");
    println!(
        "{} Removed refresh lock taken {}",
        "✓".green(),
        format_time(record.acquired_at)
    );
    Ok(())
}
