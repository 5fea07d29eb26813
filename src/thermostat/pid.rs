// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PID regulator driving the indicator brightness
//!
//! The regulator reads the live setpoint on every call, so a setpoint change
//! takes effect on the next computation without any commit step. The time
//! step is measured between calls instead of assuming one tick per second,
//! which keeps the integral and derivative gains meaningful when ticks drift.

use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use super::setpoint::Setpoint;
use crate::config::PidConfig;

/// Return the output limits as an ordered `(min, max)` pair.
///
/// A non-finite limit falls back to the default range and inverted limits are
/// swapped, so `f64::clamp` can never panic on them.
fn ordered_limits(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        let defaults = PidConfig::default();
        warn!(
            "[PID] Non-finite output limits [{}, {}], using [{}, {}]",
            min, max, defaults.output_min, defaults.output_max
        );
        return (defaults.output_min, defaults.output_max);
    }
    if min > max {
        warn!("[PID] Output limits [{}, {}] are inverted, swapping them", min, max);
        return (max, min);
    }
    (min, max)
}

/// PID controller producing a brightness level
#[derive(Debug, Clone)]
pub struct PidRegulator {
    /// Proportional gain
    kp: f64,
    /// Integral gain
    ki: f64,
    /// Derivative gain
    kd: f64,
    /// Output limits, always ordered and finite
    output_min: f64,
    output_max: f64,
    /// Calls closer than this to the previous update return the cached output
    sample_time: Duration,
    /// Target temperature, shared with the setpoint controller
    setpoint: Setpoint,
    /// Accumulated error over time, in degree-seconds
    integral: f64,
    /// Previous measurement for the derivative term
    last_measurement: Option<f64>,
    /// Time of the previous accepted update
    last_update: Option<Instant>,
    /// Output of the previous accepted update
    last_output: f64,
}

impl PidRegulator {
    /// Create a new regulator tracking `setpoint`
    pub fn new(config: &PidConfig, setpoint: Setpoint) -> Self {
        let (output_min, output_max) = ordered_limits(config.output_min, config.output_max);
        Self {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            output_min,
            output_max,
            sample_time: Duration::from_millis(config.sample_time_ms),
            setpoint,
            integral: 0.0,
            last_measurement: None,
            last_update: None,
            last_output: output_min,
        }
    }

    /// Compute the control output for a temperature in degrees Fahrenheit
    pub fn compute(&mut self, measured: f64) -> f64 {
        self.compute_at(measured, Instant::now())
    }

    /// Compute the control output as of `now`.
    ///
    /// A non-finite measurement, or a call less than the sample time after
    /// the previous update, leaves the internal state untouched and returns
    /// the previous output.
    pub fn compute_at(&mut self, measured: f64, now: Instant) -> f64 {
        if !measured.is_finite() {
            warn!(
                "[PID] Ignoring non-finite measurement {}, keeping output {}",
                measured, self.last_output
            );
            return self.last_output;
        }

        let elapsed = self
            .last_update
            .map(|previous| now.saturating_duration_since(previous));
        if let Some(elapsed) = elapsed {
            if elapsed < self.sample_time {
                debug!(
                    "[PID] {:?} since last update is below the {:?} sample time, keeping output {}",
                    elapsed, self.sample_time, self.last_output
                );
                return self.last_output;
            }
        }

        let setpoint = self.setpoint.get() as f64;
        let error = setpoint - measured;
        let dt = elapsed.map_or(0.0, |elapsed| elapsed.as_secs_f64());

        let proportional = self.kp * error;

        let integral_state = self.integral + error * dt;
        let integral = self.ki * integral_state;

        // Derivative on measurement: a setpoint step does not kick the output
        let derivative = match self.last_measurement {
            Some(previous) if dt > 0.0 => -self.kd * (measured - previous) / dt,
            _ => 0.0,
        };

        let output = proportional + integral + derivative;
        if !output.is_finite() {
            warn!("[PID] Non-finite output, keeping output {}", self.last_output);
            return self.last_output;
        }
        let clamped = output.clamp(self.output_min, self.output_max);

        self.integral = integral_state;
        self.last_measurement = Some(measured);
        self.last_update = Some(now);
        self.last_output = clamped;

        debug!(
            "[PID] Temp: {:.2}, SetPoint: {}, P: {:.4}, I: {:.4}, D: {:.4}, Output: {:.4}",
            measured, setpoint, proportional, integral, derivative, clamped
        );

        clamped
    }

    /// Output of the last accepted computation
    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    /// Setpoint the regulator tracks
    pub fn setpoint(&self) -> i64 {
        self.setpoint.get()
    }

    /// Accumulated integral state
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Reset accumulated state
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_measurement = None;
        self.last_update = None;
        self.last_output = self.output_min;
    }
}
