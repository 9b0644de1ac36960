// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Agent Host CLI
//!
//! The `agent-host` binary operates on the Agent aggregate host.
//!
//! ## Commands
//!
//! - `agent-host config show|validate|generate` - Configuration management
//! - `agent-host scenario` - Suspend/resume walkthrough against the configured storage
//!
//! Logging goes to stderr. The filter comes from `RUST_LOG`, else
//! `--log-level`, else `spec.observability.logging.level`; the output format
//! from `spec.observability.logging.format`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use agent_host::commands::{self, ConfigCommand, ScenarioArgs};
use agent_host_core::domain::host_config::{AgentHostConfig, LoggingConfig};

/// Agent Host - stateful agents with resumable execution
#[derive(Parser)]
#[command(name = "agent-host")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "AGENT_HOST_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Run the suspend/resume walkthrough and print the emitted events
    #[command(name = "scenario")]
    Scenario(ScenarioArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands report configuration errors themselves; logging falls back to defaults
    let logging = AgentHostConfig::load_or_default(cli.config.clone())
        .map(|c| c.spec.observability.logging)
        .unwrap_or_default();
    init_logging(cli.log_level.as_deref(), &logging)?;
    debug!(config = ?cli.config, format = %logging.format, "Logging initialized");

    match cli.command {
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        Some(Commands::Scenario(args)) => commands::scenario::handle_command(args, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level_override: Option<&str>, logging: &LoggingConfig) -> Result<()> {
    let level = level_override.unwrap_or(&logging.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
