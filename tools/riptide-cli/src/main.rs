//! Riptide CLI - exercise and configure the Riptide transport
//!
//! # Commands
//!
//! - `riptide loopback` - Host and join in one process over the loopback engine
//! - `riptide config show` - Print the effective transport config
//! - `riptide config init` - Write a default riptide.toml
//! - `riptide config path` - Print where riptide.toml lives
//!
//! # Usage
//!
//! ```bash
//! # Send 10 reliable bytes client -> server and echo them back
//! riptide loopback
//!
//! # Larger unreliable payload on another port
//! riptide loopback --port 9000 --bytes 1200 --unreliable
//!
//! # Verbose engine output
//! RUST_LOG=debug riptide loopback
//! ```

mod config_cmd;
mod loopback;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Riptide CLI - exercise and configure the Riptide transport
#[derive(Parser)]
#[command(name = "riptide")]
#[command(about = "Exercise and configure the Riptide transport")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a host + client session over the in-process loopback engine
    Loopback(loopback::LoopbackArgs),

    /// Inspect or create the transport config file
    Config(config_cmd::ConfigArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Loopback(args) => loopback::execute(args),
        Commands::Config(args) => config_cmd::execute(args),
    }
}
