// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides the schema dump used by `--show-config-schema` and the
//! validation rules that the JSON schema cannot express.

use anyhow::{Context, Result};
use log::debug;

use super::{Config, PersistenceBackend};

/// Output the embedded JSON schema to the console.
///
/// ```bash
/// ./rust_thermostat --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../../resources/config.schema.json");

    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Cadence**: the tick period and every tick-based cadence are non-zero
/// - **PID**: gains are finite, the output limits are ordered within `[0, 1]`
///   and the sample time is shorter than the tick period
/// - **Indicator**: the baseline level lies within `[0, 1]`
/// - **Persistence**: the selected backend has a non-empty target
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let control_loop = &config.control_loop;
    if control_loop.period_ms == 0 {
        anyhow::bail!("control_loop.period_ms must be greater than zero");
    }
    if control_loop.telemetry_every_ticks == 0 {
        anyhow::bail!("control_loop.telemetry_every_ticks must be greater than zero");
    }
    if control_loop.persistence_every_ticks == 0 {
        anyhow::bail!("control_loop.persistence_every_ticks must be greater than zero");
    }
    if control_loop.rotation_window_ticks < 2 {
        anyhow::bail!(
            "control_loop.rotation_window_ticks must be at least 2, got {}",
            control_loop.rotation_window_ticks
        );
    }

    let pid = &config.pid;
    for (name, gain) in [("kp", pid.kp), ("ki", pid.ki), ("kd", pid.kd)] {
        if !gain.is_finite() {
            anyhow::bail!("pid.{} must be a finite number", name);
        }
    }
    if !(0.0..=1.0).contains(&pid.output_min)
        || !(0.0..=1.0).contains(&pid.output_max)
        || pid.output_min > pid.output_max
    {
        anyhow::bail!(
            "pid output limits must satisfy 0 <= output_min <= output_max <= 1, got [{}, {}]",
            pid.output_min,
            pid.output_max
        );
    }
    if pid.sample_time_ms >= control_loop.period_ms {
        anyhow::bail!(
            "pid.sample_time_ms ({}) must be shorter than control_loop.period_ms ({})",
            pid.sample_time_ms,
            control_loop.period_ms
        );
    }

    if !(0.0..=1.0).contains(&config.indicator.baseline_level) {
        anyhow::bail!(
            "indicator.baseline_level must lie within [0, 1], got {}",
            config.indicator.baseline_level
        );
    }

    let persistence = &config.persistence;
    if persistence.enabled {
        match persistence.backend {
            PersistenceBackend::JsonLines if persistence.path.trim().is_empty() => {
                anyhow::bail!("persistence.path must not be empty for the json_lines backend")
            }
            PersistenceBackend::Redis if persistence.redis_key.trim().is_empty() => {
                anyhow::bail!("persistence.redis_key must not be empty for the redis backend")
            }
            _ => {}
        }
    }

    if config.telemetry.enabled && config.telemetry.serial_device.trim().is_empty() {
        anyhow::bail!("telemetry.serial_device must not be empty when telemetry is enabled");
    }

    Ok(())
}
