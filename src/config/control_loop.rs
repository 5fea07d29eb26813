// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Control loop scheduling configuration

use serde::{Deserialize, Serialize};

/// Configuration of the control loop cadence and its periodic sub-triggers.
///
/// All cadences are expressed in ticks of the loop, not in wall-clock time:
/// with the default 1 s period, telemetry goes out every 30 s and a log record
/// is persisted every 5 minutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlLoopConfig {
    /// Nominal tick period in milliseconds.
    ///
    /// The loop sleeps this long after each tick body; the period is not
    /// deadline-corrected, so slow ticks push the following ones back.
    pub period_ms: u64,

    /// Emit a telemetry record every N ticks
    pub telemetry_every_ticks: u64,

    /// Persist a log record every N ticks
    pub persistence_every_ticks: u64,

    /// Length of the display rotation window in ticks.
    ///
    /// The first half of the window shows the temperature, the second half the
    /// setpoint. The indicator is resynchronised once per window.
    pub rotation_window_ticks: u32,

    /// Setpoint in degrees Fahrenheit at startup
    pub initial_setpoint: i64,

    /// How long the supervisor waits for the loop to stop, in milliseconds
    pub shutdown_timeout_ms: u64,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            telemetry_every_ticks: 30,
            persistence_every_ticks: 300,
            rotation_window_ticks: 10,
            initial_setpoint: 72,
            shutdown_timeout_ms: 5000,
        }
    }
}
