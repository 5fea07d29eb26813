// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Hardware collaborator configuration
//!
//! Selects the driver family (simulated or native Linux sysfs) and carries the
//! device paths the native drivers need.

use serde::{Deserialize, Serialize};

/// Driver family used for the sensor, indicator, display and buttons
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DriverType {
    /// In-process simulation, no hardware required
    Mock,
    /// Linux sysfs devices (Raspberry Pi)
    Native,
}

/// Hardware configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HardwareConfig {
    /// Driver family
    pub driver: DriverType,

    /// Sysfs file exposing the temperature in milli-degrees Celsius
    pub sensor_path: String,

    /// Sysfs PWM directory driving the red channel
    pub red_pwm_path: String,

    /// Sysfs PWM directory driving the blue channel
    pub blue_pwm_path: String,

    /// PWM period in nanoseconds
    pub pwm_period_ns: u64,

    /// GPIO line of the "increase setpoint" button
    pub increase_button_gpio: u32,

    /// GPIO line of the "decrease setpoint" button
    pub decrease_button_gpio: u32,

    /// Polling interval of the button lines in milliseconds
    pub button_poll_ms: u64,

    /// Parameters of the simulated thermal cell (mock driver only)
    pub simulation: SimulationConfig,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            driver: DriverType::Mock,
            sensor_path: "/sys/bus/iio/devices/iio:device0/in_temp_input".to_string(),
            red_pwm_path: "/sys/class/pwm/pwmchip0/pwm0".to_string(),
            blue_pwm_path: "/sys/class/pwm/pwmchip0/pwm1".to_string(),
            pwm_period_ns: 1_000_000,
            increase_button_gpio: 25,
            decrease_button_gpio: 12,
            button_poll_ms: 20,
            simulation: SimulationConfig::default(),
        }
    }
}

/// Simulated thermal cell parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Starting temperature in degrees Celsius
    pub initial_celsius: f64,
    /// Ambient temperature the cell relaxes toward, in degrees Celsius
    pub ambient_celsius: f64,
    /// Fraction of the gap to ambient closed at each read
    pub relaxation: f64,
    /// Peak amplitude of the uniform read noise, in degrees Celsius
    pub noise_celsius: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_celsius: 21.0,
            ambient_celsius: 22.5,
            relaxation: 0.01,
            noise_celsius: 0.05,
        }
    }
}
