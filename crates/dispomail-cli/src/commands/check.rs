//! Check command - test an address against the blocklist

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use dispomail_core::{Admission, UserAction};
use std::net::IpAddr;
use std::path::Path;

use crate::context::AppContext;

/// Check command arguments
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Email address to check
    pub email: String,

    /// Run the login or registration check (logs the attempt if blocked)
    #[arg(short, long, value_enum)]
    pub action: Option<ActionArg>,

    /// Client address recorded with a blocked attempt
    #[arg(long, value_name = "IP")]
    pub ip: Option<IpAddr>,
}

/// User action to simulate
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ActionArg {
    /// Login attempt
    Login,
    /// Registration attempt
    Register,
}

impl From<ActionArg> for UserAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Login => UserAction::Login,
            ActionArg::Register => UserAction::Register,
        }
    }
}

/// Execute check command
pub fn execute(args: CheckArgs, config: Option<&Path>) -> Result<()> {
    let ctx = AppContext::load(config)?;

    let Some(action) = args.action else {
        let gate = ctx.gate();
        match gate.first_match(&args.email) {
            Some(pattern) => println!(
                "{} {} is disposable (matched {})",
                "✗".red(),
                args.email.cyan(),
                pattern.yellow()
            ),
            None => println!("{} {} is not on the blocklist", "✓".green(), args.email.cyan()),
        }
        return Ok(());
    };

    let guard = ctx.guard()?;
    match guard.check(action.into(), &args.email, args.ip) {
        Admission::Allowed => println!("{} {} allowed", "✓".green(), args.email.cyan()),
        Admission::Rejected { message } => println!("{} {}", "✗".red(), message),
    }

    Ok(())
}
