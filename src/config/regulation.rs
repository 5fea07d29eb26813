// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PID and indicator configuration

use serde::{Deserialize, Serialize};

/// PID controller parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// Lower output limit (indicator fully off)
    pub output_min: f64,
    /// Upper output limit (indicator fully on)
    pub output_max: f64,
    /// Minimum interval between two accepted computations, in milliseconds.
    ///
    /// A call arriving sooner returns the previous output, which keeps a
    /// refresh a few milliseconds after a tick from amplifying sensor noise
    /// through the derivative term.
    pub sample_time_ms: u64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 1.2,
            ki: 0.01,
            kd: 0.05,
            output_min: 0.0,
            output_max: 1.0,
            sample_time_ms: 10,
        }
    }
}

/// Two-channel indicator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Level applied to both channels when the temperature sits on the setpoint
    pub baseline_level: f64,

    /// Hysteresis margin in degrees.
    ///
    /// Only reported in debug logs, it does not gate indicator updates.
    pub hysteresis: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            baseline_level: 0.2,
            hysteresis: 0.5,
        }
    }
}
