// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the thermostat
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against an embedded JSON schema before deserialization.
//!
//! ## Configuration Structure
//!
//! - `debug`: verbose console output of the control loop
//! - `control_loop`: tick period, emission cadences, display rotation
//! - `pid`: regulator gains and output limits
//! - `indicator`: baseline level and hysteresis margin
//! - `hardware`: driver family and device paths
//! - `telemetry`: serial telemetry link
//! - `persistence`: log record storage
//!
//! ## Usage
//!
//! ```no_run
//! use rust_thermostat::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("thermostat.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(Some(70), None, false);
//!
//! println!("Setpoint: {}", config.control_loop.initial_setpoint);
//! ```

pub mod control_loop;
pub mod hardware;
pub mod output;
pub mod regulation;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use control_loop::ControlLoopConfig;
pub use hardware::{DriverType, HardwareConfig, SimulationConfig};
pub use output::{PersistenceBackend, PersistenceConfig, TelemetryConfig};
pub use regulation::{IndicatorConfig, PidConfig};
pub use utils::{output_config_schema, validate_specific_rules};

/// Root configuration structure of the thermostat.
///
/// Every section falls back to its defaults when absent from the file, so an
/// empty YAML document is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Print per-tick status information to the log at debug level
    #[serde(default)]
    pub debug: bool,

    /// Scheduling of the control loop
    #[serde(default)]
    pub control_loop: ControlLoopConfig,

    /// PID regulator parameters
    #[serde(default)]
    pub pid: PidConfig,

    /// Indicator refresh parameters
    #[serde(default)]
    pub indicator: IndicatorConfig,

    /// Hardware collaborators
    #[serde(default)]
    pub hardware: HardwareConfig,

    /// Serial telemetry
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Log record persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Write a `<name>.sample.yaml` file with default values next to `path`
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default configuration. A file that
    /// fails schema validation, deserialization or the specific rules of
    /// [`validate_specific_rules`] is rejected, and a sample file with default
    /// values is written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        Self::from_yaml_str(&contents).or_else(|err| {
            if let Err(sample_err) = Self::create_sample_config(path) {
                error!("Failed to create sample config: {:#}", sample_err);
            }
            Err(err.context(format!("Invalid configuration file {}", path.display())))
        })
    }

    /// Parse and validate a configuration from a YAML document
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document is Null in YAML, treat it as an empty mapping
        let mut yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;
        if yaml_value.is_null() {
            yaml_value = serde_yml::Value::Mapping(serde_yml::Mapping::new());
        }

        let json_value =
            serde_json::to_value(&yaml_value).context("Failed to convert YAML to JSON")?;

        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .map_err(|err| anyhow::anyhow!("Failed to build schema validator: {}", err))?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = serde_json::from_value(json_value)
            .context("Failed to deserialize configuration")?;

        validate_specific_rules(&config)?;
        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values explicitly provided override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `setpoint` - Initial setpoint in degrees Fahrenheit
    /// * `driver` - Hardware driver family
    /// * `debug` - If true, enables debug output (never disables it)
    pub fn apply_args(&mut self, setpoint: Option<i64>, driver: Option<DriverType>, debug: bool) {
        if let Some(setpoint) = setpoint {
            debug!("Overriding initial setpoint from command line: {}", setpoint);
            self.control_loop.initial_setpoint = setpoint;
        }

        if let Some(driver) = driver {
            debug!("Overriding driver from command line: {:?}", driver);
            self.hardware.driver = driver;
        }

        if debug {
            self.debug = true;
        }
    }
}
