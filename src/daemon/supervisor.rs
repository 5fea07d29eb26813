// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Thermostat supervisor
//!
//! Owns the process lifecycle. [`Supervisor::launch`] wires the collaborators
//! into a [`ControlLoop`] running on its own task, [`Supervisor::shutdown`]
//! raises the termination flag and darkens the indicator, and
//! [`Supervisor::join`] waits a bounded time for the loop to stop.

use anyhow::{Context, Result};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::thermostat::drivers::{create_collaborators, ButtonInput, Collaborators};
use crate::thermostat::{
    create_shared_loop_state, ControlLoop, IndicatorDriver, InputDispatcher, LoopCounters,
    LoopSettings, LoopStatus, PersistenceLogger, PidRegulator, Setpoint, SetpointController,
    SharedLoopState, TelemetryReporter,
};

/// Process supervisor of the control loop
pub struct Supervisor {
    running: Arc<AtomicBool>,
    shared_state: SharedLoopState,
    loop_task: Option<JoinHandle<LoopCounters>>,
    indicator: Option<IndicatorDriver>,
    input: Option<InputDispatcher>,
    // Button drivers stop delivering presses when dropped
    buttons: Vec<Box<dyn ButtonInput>>,
    shutdown_timeout: Duration,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            shared_state: create_shared_loop_state(),
            loop_task: None,
            indicator: None,
            input: None,
            buttons: Vec::new(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }

    /// Build the collaborators selected by `config` and start the loop
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let collaborators = create_collaborators(config)
            .await
            .context("Failed to initialize hardware")?;
        self.launch_with(config, collaborators)
    }

    /// Start the loop on already constructed collaborators
    pub fn launch_with(&mut self, config: &Config, collaborators: Collaborators) -> Result<()> {
        let Collaborators {
            sensor,
            display,
            red_channel,
            blue_channel,
            serial,
            database,
            mut increase_button,
            mut decrease_button,
        } = collaborators;

        self.shutdown_timeout = Duration::from_millis(config.control_loop.shutdown_timeout_ms);

        let setpoint = Setpoint::new(config.control_loop.initial_setpoint);
        let (controller, commands) = SetpointController::new(setpoint.clone());

        // Bind the buttons first so a failure leaves nothing running
        let input = InputDispatcher::bind(
            controller,
            increase_button.as_mut(),
            decrease_button.as_mut(),
        )?;

        let pid = PidRegulator::new(&config.pid, setpoint);
        let indicator = IndicatorDriver::new(red_channel, blue_channel, config.indicator.clone());

        let mut control_loop = ControlLoop::new(
            sensor,
            display,
            pid,
            indicator.clone(),
            LoopSettings::from_config(&config.control_loop),
            self.running.clone(),
            self.shared_state.clone(),
        );
        if let Some(serial) = serial {
            control_loop = control_loop.with_telemetry(TelemetryReporter::new(serial));
        }
        if let Some(database) = database {
            control_loop = control_loop.with_persistence(PersistenceLogger::new(database));
        }

        info!(
            "Starting control loop with set point {}F",
            config.control_loop.initial_setpoint
        );
        self.loop_task = Some(tokio::spawn(control_loop.run(commands)));
        self.indicator = Some(indicator);
        self.input = Some(input);
        self.buttons.push(increase_button);
        self.buttons.push(decrease_button);
        Ok(())
    }

    /// Setpoint controller, available once launched
    pub fn controller(&self) -> Option<&SetpointController> {
        self.input.as_ref().map(InputDispatcher::controller)
    }

    pub fn shared_state(&self) -> &SharedLoopState {
        &self.shared_state
    }

    /// Request termination and darken the indicator
    pub async fn shutdown(&self) {
        info!("Shutting down thermostat");
        self.running.store(false, Ordering::Relaxed);
        {
            let mut state = self.shared_state.write().await;
            if state.status == LoopStatus::Running {
                state.status = LoopStatus::Stopping;
            }
        }
        if let Some(indicator) = &self.indicator {
            indicator.shutdown();
        }
    }

    /// Wait for the loop to stop, at most the configured shutdown timeout.
    ///
    /// Returns the final loop counters, or `None` if the loop was not
    /// launched, panicked or did not stop in time.
    pub async fn join(mut self) -> Result<Option<LoopCounters>> {
        // Stop button polling before waiting
        self.buttons.clear();

        let Some(task) = self.loop_task.take() else {
            return Ok(None);
        };
        match tokio::time::timeout(self.shutdown_timeout, task).await {
            Ok(Ok(counters)) => {
                info!(
                    "Control loop stopped: {} telemetry records sent, {} log records persisted, {} recovered errors",
                    counters.telemetry_sent,
                    counters.records_persisted,
                    counters.total_errors()
                );
                Ok(Some(counters))
            }
            Ok(Err(e)) => {
                error!("Control loop task panicked: {}", e);
                Ok(None)
            }
            Err(_) => {
                warn!(
                    "Control loop did not stop within {:?}, may be hung",
                    self.shutdown_timeout
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thermostat::drivers::mock::{
        MemoryDatabase, MemoryDisplay, MemoryPwmChannel, MemorySerialPort, ScriptedSensor,
        VirtualButton,
    };
    use crate::thermostat::drivers::{PressHandler, TemperatureSensor};
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct Bench {
        display: MemoryDisplay,
        red: MemoryPwmChannel,
        blue: MemoryPwmChannel,
        serial: MemorySerialPort,
        up: VirtualButton,
        down: VirtualButton,
    }

    fn collaborators(sensor: Box<dyn TemperatureSensor>) -> (Collaborators, Bench) {
        let bench = Bench {
            display: MemoryDisplay::new(),
            red: MemoryPwmChannel::new(),
            blue: MemoryPwmChannel::new(),
            serial: MemorySerialPort::new(),
            up: VirtualButton::new(),
            down: VirtualButton::new(),
        };
        let collaborators = Collaborators {
            sensor,
            display: Box::new(bench.display.clone()),
            red_channel: Box::new(bench.red.clone()),
            blue_channel: Box::new(bench.blue.clone()),
            serial: Some(Box::new(bench.serial.clone())),
            database: Some(Box::new(MemoryDatabase::new())),
            increase_button: Box::new(bench.up.clone()),
            decrease_button: Box::new(bench.down.clone()),
        };
        (collaborators, bench)
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle() -> Result<()> {
        let (collaborators, bench) =
            collaborators(Box::new(ScriptedSensor::constant_fahrenheit(70.0)));
        let mut supervisor = Supervisor::new();
        supervisor.launch_with(&Config::default(), collaborators)?;

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        bench.up.press();
        bench.up.press();
        bench.down.press();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(supervisor.controller().map(|c| c.current()), Some(73));
        assert!(bench.red.level() > 0.0);

        supervisor.shutdown().await;
        assert_eq!(bench.red.level(), 0.0);
        assert_eq!(bench.blue.level(), 0.0);

        let state = supervisor.shared_state().clone();
        let counters = supervisor.join().await?.expect("loop stopped");
        assert_eq!(counters.telemetry_sent, 1);
        assert_eq!(bench.serial.lines().len(), 1);
        assert_eq!(bench.display.log().clears, 1);
        assert_eq!(state.read().await.status, LoopStatus::Stopped);
        // Nothing lit the indicator again after shutdown
        assert_eq!(bench.red.level(), 0.0);
        Ok(())
    }

    struct StuckSensor;

    #[async_trait]
    impl TemperatureSensor for StuckSensor {
        async fn read_raw(&mut self) -> Result<f64> {
            std::future::pending::<()>().await;
            Ok(0.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_loop_does_not_block_exit() -> Result<()> {
        let (collaborators, bench) = collaborators(Box::new(StuckSensor));
        let mut supervisor = Supervisor::new();
        supervisor.launch_with(&Config::default(), collaborators)?;

        tokio::time::sleep(Duration::from_millis(10)).await;
        supervisor.shutdown().await;
        let state = supervisor.shared_state().clone();
        assert!(supervisor.join().await?.is_none());
        assert_eq!(state.read().await.status, LoopStatus::Stopping);
        assert_eq!(bench.display.log().clears, 0);
        Ok(())
    }

    /// Button whose GPIO line is held by another process
    struct JammedButton;

    impl ButtonInput for JammedButton {
        fn on_press(&mut self, _handler: PressHandler) -> Result<()> {
            Err(anyhow!("gpio busy"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_button_failure_leaves_nothing_running() -> Result<()> {
        let sensor = ScriptedSensor::constant_fahrenheit(70.0);
        let (mut collaborators, bench) = collaborators(Box::new(sensor.clone()));
        collaborators.decrease_button = Box::new(JammedButton);

        let mut supervisor = Supervisor::new();
        assert!(supervisor
            .launch_with(&Config::default(), collaborators)
            .is_err());
        assert!(supervisor.controller().is_none());

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(sensor.reads(), 0);
        assert!(bench.display.log().frames.is_empty());
        assert!(bench.red.history().is_empty());
        assert!(bench.blue.history().is_empty());
        assert!(bench.serial.lines().is_empty());

        assert!(supervisor.join().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_join_without_launch() -> Result<()> {
        let supervisor = Supervisor::new();
        supervisor.shutdown().await;
        assert!(supervisor.join().await?.is_none());
        Ok(())
    }
}
