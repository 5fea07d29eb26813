// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Thermostat library
//!
//! This library provides a closed-loop temperature indicator controller:
//! a background control loop samples a temperature sensor once per period,
//! regulates a two-channel (red/blue) indicator with a PID controller, refreshes
//! a two-line status display and periodically emits telemetry over a serial
//! link and log records into a database.
//!
//! The operator adjusts the setpoint through two buttons, concurrently with the
//! loop. See [`thermostat`] for the control core and [`daemon`] for the process
//! lifecycle.

pub mod config;
pub mod daemon;
pub mod error;
pub mod thermostat;

pub use error::ThermostatError;
