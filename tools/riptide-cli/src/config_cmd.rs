//! Config command - inspect or create riptide.toml

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use riptide_transport::{TransportConfig, config};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Use this file instead of the platform config path
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective config as TOML
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the config file location
    Path,
}

/// Execute the config command
pub fn execute(args: ConfigArgs) -> Result<()> {
    let path = match args.file {
        Some(path) => path,
        None => config::config_path().context("Could not determine config directory")?,
    };

    match args.action {
        ConfigAction::Show => {
            let config = load_or_default(&path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Init { force } => {
            init(&path, force)?;
            println!("Wrote {}", path.display());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

/// Config at `path`, or defaults when the file does not exist
fn load_or_default(path: &Path) -> Result<TransportConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No config file, showing defaults");
        return Ok(TransportConfig::default());
    }

    let config = TransportConfig::load_from(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Write a default config, refusing to clobber an existing file unless forced
fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    TransportConfig::default()
        .save_to(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
