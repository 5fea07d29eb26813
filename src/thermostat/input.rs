// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Button wiring
//!
//! Maps the two physical buttons onto the setpoint controller. Press
//! handlers run on the button driver's own context, concurrently with the
//! control loop.

use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

use super::drivers::ButtonInput;
use super::setpoint::SetpointController;

/// Dispatches button presses to the setpoint controller
#[derive(Debug, Clone)]
pub struct InputDispatcher {
    controller: SetpointController,
}

impl InputDispatcher {
    /// Register press handlers on both buttons
    pub fn bind(
        controller: SetpointController,
        increase: &mut dyn ButtonInput,
        decrease: &mut dyn ButtonInput,
    ) -> Result<Self> {
        let up = controller.clone();
        increase
            .on_press(Arc::new(move || {
                up.increment();
            }))
            .context("Failed to bind the increase button")?;

        let down = controller.clone();
        decrease
            .on_press(Arc::new(move || {
                down.decrement();
            }))
            .context("Failed to bind the decrease button")?;

        info!("Set point buttons bound");
        Ok(Self { controller })
    }

    pub fn controller(&self) -> &SetpointController {
        &self.controller
    }
}
