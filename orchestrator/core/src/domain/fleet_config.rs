// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Fleet Configuration Types
//
// Defines the configuration schema for a fleet coordinator, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Motion model (constant lane traversal duration)
// - Battery model (drain per lane, charge rate, low-battery threshold)
// - Event channel sizing
// - Simulation pacing and observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const KIND: &str = "FleetConfig";

/// Top-level Kubernetes-style fleet configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfigManifest {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "FleetConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: FleetConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable fleet name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfigSpec {
    #[serde(default)]
    pub motion: MotionConfig,

    #[serde(default)]
    pub battery: BatteryConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Fraction of a lane covered per tick, in (0, 1].
    /// Every lane takes the same number of ticks regardless of its weight.
    #[serde(default = "default_lane_progress_per_tick")]
    pub lane_progress_per_tick: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            lane_progress_per_tick: default_lane_progress_per_tick(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryConfig {
    /// Charge level of freshly spawned robots (percent)
    #[serde(default = "default_initial_level")]
    pub initial_level: f64,

    /// Charge consumed per lane traversed (percent)
    #[serde(default = "default_drain_per_lane")]
    pub drain_per_lane: f64,

    /// Charge gained per tick while Charging (percent)
    #[serde(default = "default_charge_per_tick")]
    pub charge_per_tick: f64,

    /// Robots stopping at a charger below this level start charging
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            initial_level: default_initial_level(),
            drain_per_lane: default_drain_per_lane(),
            charge_per_tick: default_charge_per_tick(),
            low_threshold: default_low_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Broadcast buffer size; slow subscribers lose the oldest events
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Wall-clock pause between ticks in real-time mode
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Upper bound on ticks for a single run
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions
fn default_lane_progress_per_tick() -> f64 {
    0.25
}

fn default_initial_level() -> f64 {
    100.0
}

fn default_drain_per_lane() -> f64 {
    2.0
}

fn default_charge_per_tick() -> f64 {
    5.0
}

fn default_low_threshold() -> f64 {
    30.0
}

fn default_channel_capacity() -> usize {
    1000
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_max_ticks() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FleetConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "fleet".to_string(),
                labels: None,
            },
            spec: FleetConfigSpec::default(),
        }
    }
}

impl FleetConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. FLEET_CONFIG_PATH environment variable
    /// 2. ./fleet-config.yaml (working directory)
    /// 3. ~/.fleet/config.yaml (user home)
    /// 4. /etc/fleet/config.yaml (system, Unix) or C:\ProgramData\Fleet\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("FLEET_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./fleet-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".fleet").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/fleet/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Fleet\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path (fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Some(step) = env_override::<f64>("FLEET_LANE_PROGRESS_PER_TICK") {
            self.spec.motion.lane_progress_per_tick = step;
        }
        if let Some(threshold) = env_override::<f64>("FLEET_LOW_BATTERY_THRESHOLD") {
            self.spec.battery.low_threshold = threshold;
        }
        if let Some(capacity) = env_override::<usize>("FLEET_EVENT_CHANNEL_CAPACITY") {
            self.spec.events.channel_capacity = capacity;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let step = self.spec.motion.lane_progress_per_tick;
        if !(step > 0.0 && step <= 1.0) {
            anyhow::bail!(
                "spec.motion.lane_progress_per_tick must be in (0, 1], got {}",
                step
            );
        }

        let battery = &self.spec.battery;
        for (field, value) in [
            ("initial_level", battery.initial_level),
            ("low_threshold", battery.low_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                anyhow::bail!("spec.battery.{} must be within [0, 100], got {}", field, value);
            }
        }
        if battery.drain_per_lane < 0.0 {
            anyhow::bail!("spec.battery.drain_per_lane cannot be negative");
        }
        if battery.charge_per_tick <= 0.0 {
            anyhow::bail!("spec.battery.charge_per_tick must be positive");
        }

        if self.spec.events.channel_capacity == 0 {
            anyhow::bail!("spec.events.channel_capacity must be at least 1");
        }

        if self.spec.simulation.max_ticks == 0 {
            anyhow::bail!("spec.simulation.max_ticks must be at least 1");
        }

        Ok(())
    }
}

fn env_override<T: std::str::FromStr>(name: &str) -> Option<T> {
    let val = std::env::var(name).ok()?;
    match val.trim().parse::<T>() {
        Ok(parsed) => {
            tracing::info!("Environment override: {}={}", name, val);
            Some(parsed)
        }
        Err(_) => {
            tracing::warn!("Invalid value for {}: '{}'. Ignoring.", name, val);
            None
        }
    }
}
