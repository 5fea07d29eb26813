// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Thermostat control core
//!
//! This module provides the closed-loop temperature indicator:
//! - [`pid::PidRegulator`] computes a brightness in `[0, 1]` from the error
//!   between the measured temperature and the setpoint
//! - [`indicator::IndicatorDriver`] maps that brightness onto a red/blue pair
//! - [`setpoint::SetpointController`] adjusts the setpoint from button presses
//! - [`telemetry::TelemetryReporter`] and [`persistence::PersistenceLogger`]
//!   emit periodic records
//! - [`control_loop::ControlLoop`] schedules everything once per tick
//! - [`input::InputDispatcher`] binds the buttons to the setpoint controller
//!
//! Hardware is reached only through the traits of [`drivers`].

pub mod control_loop;
pub mod drivers;
pub mod indicator;
pub mod input;
pub mod persistence;
pub mod pid;
pub mod records;
pub mod setpoint;
pub mod shared_state;
pub mod telemetry;

pub use control_loop::{ControlLoop, LoopCommand, LoopSettings, TickReport, Ticker};
pub use indicator::{Channel, IndicatorDriver, IndicatorState};
pub use input::InputDispatcher;
pub use persistence::PersistenceLogger;
pub use pid::PidRegulator;
pub use records::{LogRecord, TelemetryRecord};
pub use setpoint::{Setpoint, SetpointController};
pub use shared_state::{create_shared_loop_state, LoopCounters, LoopSnapshot, LoopStatus, SharedLoopState};
pub use telemetry::TelemetryReporter;

/// Convert a raw sensor value in degrees Celsius to degrees Fahrenheit
pub fn fahrenheit_from_celsius(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert degrees Fahrenheit to degrees Celsius
pub fn celsius_from_fahrenheit(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Round a temperature to one decimal place, as shown and recorded
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fahrenheit_conversion() {
        assert_relative_eq!(fahrenheit_from_celsius(0.0), 32.0);
        assert_relative_eq!(fahrenheit_from_celsius(100.0), 212.0);
        assert_relative_eq!(fahrenheit_from_celsius(-40.0), -40.0);
    }

    #[test]
    fn test_whole_fahrenheit_values_survive_round_trip() {
        // The control loop compares the converted reading with an integer setpoint
        for fahrenheit in [68.0, 70.0, 71.0, 72.0, 73.0, 75.0] {
            assert_eq!(
                fahrenheit_from_celsius(celsius_from_fahrenheit(fahrenheit)),
                fahrenheit
            );
        }
    }

    #[test]
    fn test_round_one_decimal() {
        assert_eq!(round_one_decimal(70.04), 70.0);
        assert_eq!(round_one_decimal(70.06), 70.1);
        assert_eq!(round_one_decimal(-3.25), -3.3);
    }
}
