//! Config command - configuration management

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use dispomail_core::config::Config;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::context::{
    audit_path, find_config_file, load_config, project_dirs, store_dir, LOCAL_CONFIG_FILES,
};

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Generate a configuration file with default values
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "dispomail.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Config file to validate (default: the -c file or the first one found)
        file: Option<PathBuf>,
    },

    /// Show config and data file locations
    Paths,
}

/// Execute config command
pub fn execute(args: ConfigArgs, config: Option<&Path>) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(config),
        ConfigAction::Generate { output, force } => generate_config(&output, force),
        ConfigAction::Validate { file } => validate_config(file.as_deref().or(config)),
        ConfigAction::Paths => show_paths(config),
    }
}

fn show_config(config: Option<&Path>) -> Result<()> {
    let (config, _) = load_config(config)?;

    let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;

    println!("{toml_str}");
    Ok(())
}

fn generate_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite",
            output.display()
        );
    }

    let toml_str = Config::default()
        .to_toml()
        .context("Failed to serialize config")?;

    // Add header comment
    let content = format!(
        "# dispomail configuration\n\
         # provider: 1 = ivolo/disposable-email-domains, 2 = RevertIT/disposable-email-domains\n\
         # store.path and audit.path default to the user data directory\n\n\
         {toml_str}"
    );

    std::fs::write(output, content)
        .with_context(|| format!("Failed to write config to {}", output.display()))?;

    info!(path = %output.display(), "Generated config file");
    println!("Configuration file generated: {}", output.display());

    Ok(())
}

fn validate_config(file: Option<&Path>) -> Result<()> {
    let path = file
        .map(Path::to_path_buf)
        .or_else(find_config_file)
        .context("No configuration file given or found")?;

    let config = Config::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    config.validate().context("Configuration validation failed")?;

    println!("{} Configuration is valid", "✓".green());
    println!("  Refresh enabled: {}", config.refresh.enabled);
    println!("  Interval: {} days", config.refresh.interval_days);
    if let Some(provider) = config.refresh.provider() {
        println!("  Provider: {}", provider.label());
    }
    println!("  Block register: {}", config.gate.block_on_register);
    println!("  Block login: {}", config.gate.block_on_login);

    Ok(())
}

fn show_paths(config: Option<&Path>) -> Result<()> {
    println!("Configuration file search paths:");
    println!();

    for (i, name) in LOCAL_CONFIG_FILES.iter().enumerate() {
        println!("  {}. ./{}", i + 1, name);
    }
    if let Some(dirs) = project_dirs() {
        println!(
            "  {}. {}",
            LOCAL_CONFIG_FILES.len() + 1,
            dirs.config_dir().join("config.toml").display()
        );
    }

    let (config, path) = load_config(config)?;
    println!();
    match path {
        Some(path) => println!("Active config: {}", path.display()),
        None => println!("Active config: {}", "(defaults)".dimmed()),
    }
    println!("Cache dir:     {}", store_dir(&config).display());
    println!("Audit log:     {}", audit_path(&config).display());

    Ok(())
}
