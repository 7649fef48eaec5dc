//! Tally - partitioned batch-insert flush engine
//!
//! # Usage
//!
//! ```bash
//! # Generate load against the in-memory sink
//! tally run --events 10000 --partitions 4 --duration 10s
//!
//! # Generate load against PostgreSQL
//! tally run --config configs/config.toml --sink postgres
//!
//! # Validate a config file
//! tally check-config --config configs/config.toml
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tally_config::{Config, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Tally - partitioned batch-insert flush engine
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit synthetic events through the flush engine
    Run(cmd::run::RunArgs),

    /// Parse and validate a config file, then print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = cmd::load_config(cli.config.as_deref())?;
            init_logging(&config.log, cli.log_level.as_deref())?;
            cmd::run::run(config, args).await
        }
        Command::CheckConfig => {
            // Check-config prints to stdout, no logging needed
            cmd::check_config::run(cli.config.as_deref())
        }
    }
}

/// Initialize the tracing subscriber for logging
///
/// Level resolution: CLI flag > config file > "info".
fn init_logging(log: &LogConfig, cli_level: Option<&str>) -> Result<()> {
    let level = cli_level.unwrap_or(log.level.as_str());
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);

    match (log.format, log.output) {
        (LogFormat::Console, LogOutput::Stdout) => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        (LogFormat::Console, LogOutput::Stderr) => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        (LogFormat::Json, LogOutput::Stdout) => registry.with(fmt::layer().json()).init(),
        (LogFormat::Json, LogOutput::Stderr) => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}
