// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Fleet CLI
//!
//! The `fleet` binary drives the coordination engine from files.
//!
//! ## Commands
//!
//! - `fleet simulate --graph FILE --scenario FILE` - Run a scenario to completion
//! - `fleet route --graph FILE --from V --to V` - Shortest route between two vertices
//! - `fleet graph inspect --graph FILE` - Summarize a navigation graph
//! - `fleet config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use fleet_core::domain::fleet_config::FleetConfigManifest;
use fleet_core::infrastructure::telemetry;
use fleet_orchestrator::commands::{self, ConfigCommand, GraphCommand, RouteArgs, SimulateArgs};

/// Fleet coordination for robots sharing a navigation graph
#[derive(Parser)]
#[command(name = "fleet")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "FLEET_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Defaults to the
    /// configuration's observability.log_level.
    #[arg(long, global = true, env = "FLEET_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario against a navigation graph
    #[command(name = "simulate")]
    Simulate(SimulateArgs),

    /// Compute the shortest route between two vertices
    #[command(name = "route")]
    Route(RouteArgs),

    /// Navigation graph tools
    #[command(name = "graph")]
    Graph {
        #[command(subcommand)]
        command: GraphCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.clone() {
        Some(level) => level,
        None => configured_log_level(cli.config.clone()),
    };
    init_logging(&level)?;
    telemetry::register_metrics();

    match cli.command {
        Some(Commands::Simulate(args)) => commands::simulate::execute(args, cli.config).await,
        Some(Commands::Route(args)) => commands::route::execute(args).await,
        Some(Commands::Graph { command }) => commands::graph::handle_command(command).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Log level from the configuration file, read before logging is up.
/// Load errors surface later when the command loads the configuration itself.
fn configured_log_level(config: Option<PathBuf>) -> String {
    FleetConfigManifest::load_or_default(config)
        .map(|config| config.spec.observability.log_level)
        .unwrap_or_else(|_| "info".to_string())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
