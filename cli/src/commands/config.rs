// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use fleet_core::domain::fleet_config::FleetConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./fleet-config.yaml)
        #[arg(short, long, default_value = "./fleet-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = FleetConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. FLEET_CONFIG_PATH: {}",
            std::env::var("FLEET_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./fleet-config.yaml");
        println!("  4. ~/.fleet/config.yaml");
        println!("  5. /etc/fleet/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Fleet:".bold());
    println!("  Name: {}", config.metadata.name);
    if let Some(labels) = &config.metadata.labels {
        let mut labels: Vec<_> = labels.iter().collect();
        labels.sort();
        for (key, value) in labels {
            println!("  {}: {}", key, value);
        }
    }
    println!();

    let spec = &config.spec;
    println!("{}", "Motion:".bold());
    println!(
        "  Lane progress per tick: {}",
        spec.motion.lane_progress_per_tick
    );
    println!();

    println!("{}", "Battery:".bold());
    println!("  Initial level: {}%", spec.battery.initial_level);
    println!("  Drain per lane: {}%", spec.battery.drain_per_lane);
    println!("  Charge per tick: {}%", spec.battery.charge_per_tick);
    println!("  Low threshold: {}%", spec.battery.low_threshold);
    println!();

    println!("{}", "Simulation:".bold());
    println!("  Tick interval: {} ms", spec.simulation.tick_interval_ms);
    println!("  Max ticks: {}", spec.simulation.max_ticks);
    println!("  Event channel capacity: {}", spec.events.channel_capacity);
    println!("  Log level: {}", spec.observability.log_level);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = FleetConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/fleet-config-with-examples.yaml")
    } else {
        include_str!("../../templates/fleet-config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_valid_manifests() {
        for template in [
            include_str!("../../templates/fleet-config-minimal.yaml"),
            include_str!("../../templates/fleet-config-with-examples.yaml"),
        ] {
            let config = FleetConfigManifest::from_yaml_str(template).unwrap();
            config.validate().unwrap();
        }
    }
}
