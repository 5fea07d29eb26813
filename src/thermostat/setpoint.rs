// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Operator-adjustable setpoint
//!
//! The setpoint is a single atomic integer shared between the input path
//! (writer) and the control loop and its PID regulator (readers), so reads
//! never observe a torn value. Every change is followed by a
//! [`LoopCommand::SetpointChanged`] so the loop refreshes the indicator
//! without waiting for its next tick.

use log::{debug, info};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::control_loop::LoopCommand;

/// Default setpoint in degrees Fahrenheit
pub const DEFAULT_SETPOINT: i64 = 72;

/// Shared handle on the target temperature in whole degrees Fahrenheit.
///
/// Cloning the handle shares the underlying value. No bounds are enforced.
#[derive(Debug, Clone)]
pub struct Setpoint(Arc<AtomicI64>);

impl Setpoint {
    /// Create a new setpoint
    pub fn new(degrees: i64) -> Self {
        Self(Arc::new(AtomicI64::new(degrees)))
    }

    /// Current setpoint
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Replace the setpoint
    pub fn set(&self, degrees: i64) {
        self.0.store(degrees, Ordering::SeqCst);
    }

    /// Atomically add `delta` and return the new value
    pub fn adjust(&self, delta: i64) -> i64 {
        self.0.fetch_add(delta, Ordering::SeqCst).wrapping_add(delta)
    }
}

impl Default for Setpoint {
    fn default() -> Self {
        Self::new(DEFAULT_SETPOINT)
    }
}

/// Owner of the setpoint on the input side.
///
/// `increment` and `decrement` are safe to call from any thread while the
/// control loop runs.
#[derive(Debug, Clone)]
pub struct SetpointController {
    setpoint: Setpoint,
    loop_commands: mpsc::UnboundedSender<LoopCommand>,
}

impl SetpointController {
    /// Create a controller for `setpoint`.
    ///
    /// Returns the receiving end of the refresh channel, to be handed to the
    /// control loop.
    pub fn new(setpoint: Setpoint) -> (Self, mpsc::UnboundedReceiver<LoopCommand>) {
        let (loop_commands, receiver) = mpsc::unbounded_channel();
        (
            Self {
                setpoint,
                loop_commands,
            },
            receiver,
        )
    }

    /// Shared handle on the setpoint
    pub fn setpoint(&self) -> &Setpoint {
        &self.setpoint
    }

    /// Current setpoint
    pub fn current(&self) -> i64 {
        self.setpoint.get()
    }

    /// Raise the setpoint by one degree and request an indicator refresh
    pub fn increment(&self) -> i64 {
        info!("Increasing set point");
        self.step(1)
    }

    /// Lower the setpoint by one degree and request an indicator refresh
    pub fn decrement(&self) -> i64 {
        info!("Decreasing set point");
        self.step(-1)
    }

    fn step(&self, delta: i64) -> i64 {
        let setpoint = self.setpoint.adjust(delta);
        debug!("Set point is now {}F", setpoint);

        if self
            .loop_commands
            .send(LoopCommand::SetpointChanged { setpoint })
            .is_err()
        {
            debug!("Control loop is gone, indicator refresh for set point {} dropped", setpoint);
        }
        setpoint
    }
}
