//! Watch command - periodic trigger loop

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use super::refresh::print_outcome;
use crate::context::AppContext;

/// Granularity of the interrupt check while sleeping
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Watch command arguments
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds between ticks (default: refresh.tick_interval_secs)
    #[arg(short, long, value_name = "SECS")]
    pub interval: Option<u64>,
}

/// Execute watch command
pub fn execute(args: WatchArgs, config: Option<&Path>) -> Result<()> {
    let ctx = AppContext::load(config)?;
    let scheduler = ctx.scheduler()?;
    let interval = Duration::from_secs(
        args.interval
            .unwrap_or(ctx.config.refresh.tick_interval_secs)
            .max(1),
    );

    // Set up signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    println!(
        "{} Watching, tick every {}s (Ctrl-C to stop)",
        "▶".green(),
        interval.as_secs()
    );

    while running.load(Ordering::SeqCst) {
        print_outcome(&scheduler.tick());

        let next = Instant::now() + interval;
        while running.load(Ordering::SeqCst) && Instant::now() < next {
            std::thread::sleep(POLL_INTERVAL.min(next.saturating_duration_since(Instant::now())));
        }
    }

    info!("Watch stopped");
    Ok(())
}
