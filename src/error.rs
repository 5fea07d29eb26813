// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error taxonomy of the thermostat core
//!
//! Every variant except [`ThermostatError::Config`] is recovered inside the
//! control loop tick that produced it: the error is logged and counted in the
//! shared loop state, and the loop carries on with the next tick.

use thiserror::Error;

/// Errors produced by the thermostat control core
#[derive(Debug, Error)]
pub enum ThermostatError {
    /// The temperature sensor could not be read or returned a non-finite value
    #[error("temperature sensor read failed: {0}")]
    SensorRead(String),

    /// The status display rejected a write
    #[error("display write failed: {0}")]
    Display(String),

    /// The serial telemetry link rejected a write
    #[error("telemetry transport write failed: {0}")]
    Transport(String),

    /// The database rejected a log record
    #[error("persistence insert failed: {0}")]
    Persistence(String),

    /// Invalid configuration, only raised at startup
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ThermostatError {
    /// Whether the control loop recovers from this error locally
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ThermostatError::Config(_))
    }

    pub(crate) fn sensor(err: impl std::fmt::Display) -> Self {
        ThermostatError::SensorRead(format!("{:#}", err))
    }

    pub(crate) fn display(err: impl std::fmt::Display) -> Self {
        ThermostatError::Display(format!("{:#}", err))
    }

    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        ThermostatError::Transport(format!("{:#}", err))
    }

    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        ThermostatError::Persistence(format!("{:#}", err))
    }
}
