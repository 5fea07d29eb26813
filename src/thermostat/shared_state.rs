// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared state of the control loop
//!
//! The control loop publishes a snapshot of its status and counters after
//! every tick and every serviced command. The supervisor reads it to wait for
//! the loop to stop and to report statistics on exit.

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::RwLock;

use super::indicator::IndicatorState;
use crate::error::ThermostatError;

/// Lifecycle of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LoopStatus {
    /// Ticking normally
    #[default]
    Running,
    /// Termination requested, not yet observed by the loop
    Stopping,
    /// The loop exited after cleaning up the display
    Stopped,
}

/// Event and error counters since startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopCounters {
    pub sensor_errors: u64,
    pub display_errors: u64,
    pub transport_errors: u64,
    pub persistence_errors: u64,
    pub telemetry_sent: u64,
    pub records_persisted: u64,
    pub indicator_refreshes: u64,
}

impl LoopCounters {
    /// Count a recovered error against its category
    pub fn record_error(&mut self, error: &ThermostatError) {
        let counter = match error {
            ThermostatError::SensorRead(_) => &mut self.sensor_errors,
            ThermostatError::Display(_) => &mut self.display_errors,
            ThermostatError::Transport(_) => &mut self.transport_errors,
            ThermostatError::Persistence(_) => &mut self.persistence_errors,
            ThermostatError::Config(_) => return,
        };
        *counter += 1;
    }

    /// Total recovered errors
    pub fn total_errors(&self) -> u64 {
        self.sensor_errors + self.display_errors + self.transport_errors + self.persistence_errors
    }
}

/// Snapshot published by the control loop
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoopSnapshot {
    pub status: LoopStatus,
    /// Completed ticks
    pub tick: u64,
    /// Last successful reading in degrees Fahrenheit
    pub last_temperature: Option<f64>,
    /// Last control signal applied to the indicator
    pub last_control_signal: Option<f64>,
    pub setpoint: i64,
    pub indicator: IndicatorState,
    pub counters: LoopCounters,
    pub last_update: Option<DateTime<Local>>,
}

/// Type alias for the loop snapshot wrapped in Arc<RwLock<>>
pub type SharedLoopState = std::sync::Arc<RwLock<LoopSnapshot>>;

/// Create a new shared loop state
pub fn create_shared_loop_state() -> SharedLoopState {
    std::sync::Arc::new(RwLock::new(LoopSnapshot::default()))
}
