// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Periodic control loop
//!
//! The loop owns the sensor, the display, the PID regulator and the
//! indicator. Each tick it reads the temperature, regulates the indicator,
//! updates the two-line display and, on its cadence, emits telemetry and log
//! records. Every runtime failure is recovered inside the tick that produced
//! it.
//!
//! ```text
//!  Running ──(termination flag)──▶ Stopping ──(display cleared)──▶ Stopped
//! ```
//!
//! Between ticks the loop services [`LoopCommand`]s. Commands are polled
//! before the ticker, so a refresh requested between two ticks always runs
//! before the next tick body.

use chrono::Local;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use super::drivers::{DisplayDriver, TemperatureSensor};
use super::indicator::{IndicatorDriver, IndicatorState};
use super::persistence::PersistenceLogger;
use super::pid::PidRegulator;
use super::records::{LogRecord, TelemetryRecord};
use super::shared_state::{LoopCounters, LoopStatus, SharedLoopState};
use super::telemetry::TelemetryReporter;
use super::fahrenheit_from_celsius;
use crate::config::ControlLoopConfig;
use crate::error::ThermostatError;

/// Time format of the first display line
pub const DISPLAY_TIME_FORMAT: &str = "%m/%d %H:%M:%S";

/// Second display line before any successful reading
pub const UNKNOWN_TEMPERATURE_LINE: &str = "Temp: --.-";

/// Commands serviced by the loop between ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    /// The setpoint changed, refresh the indicator now
    SetpointChanged { setpoint: i64 },
}

/// Cadence of the loop and its periodic sub-triggers
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    pub period: Duration,
    pub telemetry_every: u64,
    pub persistence_every: u64,
    pub rotation_window: u32,
}

impl LoopSettings {
    pub fn from_config(config: &ControlLoopConfig) -> Self {
        Self {
            period: Duration::from_millis(config.period_ms),
            telemetry_every: config.telemetry_every_ticks.max(1),
            persistence_every: config.persistence_every_ticks.max(1),
            rotation_window: config.rotation_window_ticks.max(2),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&ControlLoopConfig::default())
    }
}

/// Best-effort periodic timer.
///
/// The first deadline is immediate. Each [`rearm`](Ticker::rearm) schedules
/// the next deadline one period after the current instant, so time spent in a
/// tick body delays every following tick.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now(),
        }
    }

    /// Wait for the current deadline
    pub async fn wait(&self) {
        sleep_until(self.next).await;
    }

    /// Schedule the next deadline one period from now
    pub fn rearm(&mut self) {
        self.next = Instant::now() + self.period;
    }
}

/// Position within the display rotation window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RotationPhase {
    shows_temperature: bool,
    completes_window: bool,
}

#[derive(Debug)]
struct DisplayRotation {
    window: u32,
    position: u32,
}

impl DisplayRotation {
    fn new(window: u32) -> Self {
        Self {
            window: window.max(2),
            position: 0,
        }
    }

    fn advance(&mut self) -> RotationPhase {
        self.position += 1;
        let phase = RotationPhase {
            shows_temperature: self.position <= self.window / 2,
            completes_window: self.position == self.window,
        };
        if phase.completes_window {
            self.position = 0;
        }
        phase
    }
}

/// Outcome of one tick
#[derive(Debug, Default)]
pub struct TickReport {
    /// Tick number, starting at 1
    pub tick: u64,
    /// Reading of this tick in degrees Fahrenheit, `None` if the read failed
    pub temperature: Option<f64>,
    /// Control signal computed this tick
    pub control_signal: Option<f64>,
    /// Display lines composed this tick
    pub line1: String,
    pub line2: String,
    /// The window boundary resynchronised the indicator
    pub boundary_refresh: bool,
    pub telemetry_sent: bool,
    pub record_persisted: bool,
    /// Errors recovered during the tick
    pub errors: Vec<ThermostatError>,
}

enum LoopEvent {
    Tick,
    Command(LoopCommand),
    CommandsClosed,
}

/// The periodic scheduler
pub struct ControlLoop {
    sensor: Box<dyn TemperatureSensor>,
    display: Box<dyn DisplayDriver>,
    pid: PidRegulator,
    indicator: IndicatorDriver,
    telemetry: Option<TelemetryReporter>,
    persistence: Option<PersistenceLogger>,
    settings: LoopSettings,
    running: Arc<AtomicBool>,
    shared_state: SharedLoopState,
    rotation: DisplayRotation,
    tick: u64,
    last_temperature: Option<f64>,
    last_control_signal: Option<f64>,
    counters: LoopCounters,
}

impl ControlLoop {
    /// Create a loop without telemetry or persistence outputs
    pub fn new(
        sensor: Box<dyn TemperatureSensor>,
        display: Box<dyn DisplayDriver>,
        pid: PidRegulator,
        indicator: IndicatorDriver,
        settings: LoopSettings,
        running: Arc<AtomicBool>,
        shared_state: SharedLoopState,
    ) -> Self {
        let rotation = DisplayRotation::new(settings.rotation_window);
        Self {
            sensor,
            display,
            pid,
            indicator,
            telemetry: None,
            persistence: None,
            settings,
            running,
            shared_state,
            rotation,
            tick: 0,
            last_temperature: None,
            last_control_signal: None,
            counters: LoopCounters::default(),
        }
    }

    /// Send telemetry through `reporter`
    pub fn with_telemetry(mut self, reporter: TelemetryReporter) -> Self {
        self.telemetry = Some(reporter);
        self
    }

    /// Persist log records through `logger`
    pub fn with_persistence(mut self, logger: PersistenceLogger) -> Self {
        self.persistence = Some(logger);
        self
    }

    /// Completed ticks
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn counters(&self) -> &LoopCounters {
        &self.counters
    }

    pub fn indicator(&self) -> &IndicatorDriver {
        &self.indicator
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Run until the termination flag is cleared, then clean up the display.
    ///
    /// Returns the counters accumulated over the whole run.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<LoopCommand>) -> LoopCounters {
        info!(
            "Control loop started: period {:?}, telemetry every {} ticks, persistence every {} ticks",
            self.settings.period, self.settings.telemetry_every, self.settings.persistence_every
        );

        let mut ticker = Ticker::new(self.settings.period);
        let mut commands_open = true;

        while self.is_running() {
            let event = tokio::select! {
                biased;

                command = commands.recv(), if commands_open => match command {
                    Some(command) => LoopEvent::Command(command),
                    None => LoopEvent::CommandsClosed,
                },

                _ = ticker.wait() => LoopEvent::Tick,
            };

            // Termination is only observed at an event boundary
            if !self.is_running() {
                break;
            }

            match event {
                LoopEvent::Tick => {
                    self.tick().await;
                    ticker.rearm();
                }
                LoopEvent::Command(command) => self.handle_command(command).await,
                LoopEvent::CommandsClosed => {
                    debug!("Command channel closed, ticking only");
                    commands_open = false;
                }
            }
        }

        self.stop().await;
        self.counters
    }

    /// Execute one tick body
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        // Read, regulate and apply. A failed read keeps the previous indicator.
        match self.read_temperature().await {
            Ok(temperature) => {
                let signal = self.pid.compute(temperature);
                self.apply_indicator(temperature, signal);
                report.temperature = Some(temperature);
                report.control_signal = Some(signal);
            }
            Err(e) => {
                warn!("Tick {}: {}", self.tick + 1, e);
                report.errors.push(e);
            }
        }

        let phase = self.rotation.advance();
        let setpoint = self.pid.setpoint();
        report.line1 = Local::now().format(DISPLAY_TIME_FORMAT).to_string();
        report.line2 = if phase.shows_temperature {
            match self.last_temperature {
                Some(temperature) => format!("Temp: {:.1}", temperature),
                None => UNKNOWN_TEMPERATURE_LINE.to_string(),
            }
        } else {
            format!("Set Point: {}F", setpoint)
        };

        if phase.completes_window {
            debug!("Rotation window complete, resynchronising indicator");
            report.boundary_refresh = true;
            if let Err(e) = self.refresh_indicator().await {
                warn!("Indicator resync failed: {}", e);
                report.errors.push(e);
            }
        }

        if let Err(e) = self
            .display
            .show(&report.line1, &report.line2)
            .await
            .map_err(ThermostatError::display)
        {
            warn!("Tick {}: {}", self.tick + 1, e);
            report.errors.push(e);
        }

        self.tick += 1;
        report.tick = self.tick;

        let telemetry_due = self.tick % self.settings.telemetry_every == 0;
        let persistence_due = self.tick % self.settings.persistence_every == 0;
        if telemetry_due || persistence_due {
            self.emit_records(telemetry_due, persistence_due, &mut report)
                .await;
        }

        for e in &report.errors {
            self.counters.record_error(e);
        }
        if report.telemetry_sent {
            self.counters.telemetry_sent += 1;
        }
        if report.record_persisted {
            self.counters.records_persisted += 1;
        }

        debug!(
            "Tick {} done: temp {:?}, signal {:?}, set point {}, {} error(s)",
            self.tick,
            report.temperature,
            report.control_signal,
            setpoint,
            report.errors.len()
        );
        self.publish(None).await;
        report
    }

    async fn emit_records(&mut self, telemetry_due: bool, persistence_due: bool, report: &mut TickReport) {
        let Some(temperature) = self.last_temperature else {
            warn!(
                "Tick {}: no temperature reading yet, skipping periodic records",
                self.tick
            );
            return;
        };
        let setpoint = self.pid.setpoint();
        let now = Local::now();

        if telemetry_due {
            if let Some(reporter) = self.telemetry.as_mut() {
                match reporter
                    .emit(&TelemetryRecord::new(now, temperature, setpoint))
                    .await
                {
                    Ok(()) => report.telemetry_sent = true,
                    Err(e) => {
                        warn!("Tick {}: {}", self.tick, e);
                        report.errors.push(e);
                    }
                }
            }
        }

        if persistence_due {
            if let Some(logger) = self.persistence.as_mut() {
                match logger.emit(&LogRecord::new(now, temperature, setpoint)).await {
                    Ok(()) => report.record_persisted = true,
                    Err(e) => {
                        error!("Tick {}: {}", self.tick, e);
                        report.errors.push(e);
                    }
                }
            }
        }
    }

    /// Service one out-of-band command
    pub async fn handle_command(&mut self, command: LoopCommand) {
        match command {
            LoopCommand::SetpointChanged { setpoint } => {
                info!("Set point changed to {}F, refreshing indicator", setpoint);
                if let Err(e) = self.refresh_indicator().await {
                    warn!("Indicator refresh after set point change failed: {}", e);
                    self.counters.record_error(&e);
                }
            }
        }
        self.publish(None).await;
    }

    async fn read_temperature(&mut self) -> Result<f64, ThermostatError> {
        let celsius = self
            .sensor
            .read_raw()
            .await
            .map_err(ThermostatError::sensor)?;
        if !celsius.is_finite() {
            return Err(ThermostatError::SensorRead(format!(
                "non-finite reading {}",
                celsius
            )));
        }
        let fahrenheit = fahrenheit_from_celsius(celsius);
        self.last_temperature = Some(fahrenheit);
        Ok(fahrenheit)
    }

    /// Fresh read, compute and apply, outside the regular tick sequence
    async fn refresh_indicator(&mut self) -> Result<IndicatorState, ThermostatError> {
        let temperature = self.read_temperature().await?;
        let signal = self.pid.compute(temperature);
        Ok(self.apply_indicator(temperature, signal))
    }

    fn apply_indicator(&mut self, temperature: f64, signal: f64) -> IndicatorState {
        self.last_control_signal = Some(signal);
        match self
            .indicator
            .refresh(temperature, self.pid.setpoint(), signal)
        {
            Some(state) => {
                self.counters.indicator_refreshes += 1;
                state
            }
            None => self.indicator.state(),
        }
    }

    async fn stop(&mut self) {
        info!("Control loop stopping after {} ticks", self.tick);
        if let Err(e) = self
            .display
            .clear()
            .await
            .map_err(ThermostatError::display)
        {
            warn!("Display cleanup failed: {}", e);
            self.counters.record_error(&e);
        }
        self.publish(Some(LoopStatus::Stopped)).await;
        info!(
            "Control loop stopped: {} telemetry records, {} log records, {} recovered errors",
            self.counters.telemetry_sent,
            self.counters.records_persisted,
            self.counters.total_errors()
        );
    }

    async fn publish(&mut self, status: Option<LoopStatus>) {
        let mut state = self.shared_state.write().await;
        if let Some(status) = status {
            state.status = status;
        }
        state.tick = self.tick;
        state.last_temperature = self.last_temperature;
        state.last_control_signal = self.last_control_signal;
        state.setpoint = self.pid.setpoint();
        state.indicator = self.indicator.state();
        state.counters = self.counters.clone();
        state.last_update = Some(Local::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndicatorConfig, PidConfig};
    use crate::thermostat::drivers::mock::{
        MemoryDatabase, MemoryDisplay, MemoryPwmChannel, MemorySerialPort, ScriptedSensor,
    };
    use crate::thermostat::drivers::MockTemperatureSensor;
    use crate::thermostat::setpoint::{Setpoint, SetpointController};
    use crate::thermostat::shared_state::create_shared_loop_state;
    use crate::thermostat::{PersistenceLogger, TelemetryReporter};
    use approx::assert_relative_eq;

    struct Rig {
        sensor: ScriptedSensor,
        display: MemoryDisplay,
        red: MemoryPwmChannel,
        blue: MemoryPwmChannel,
        serial: MemorySerialPort,
        database: MemoryDatabase,
        setpoint: Setpoint,
        running: Arc<AtomicBool>,
        state: SharedLoopState,
    }

    fn rig(sensor: ScriptedSensor, setpoint: i64) -> (ControlLoop, Rig) {
        let rig = Rig {
            sensor,
            display: MemoryDisplay::new(),
            red: MemoryPwmChannel::new(),
            blue: MemoryPwmChannel::new(),
            serial: MemorySerialPort::new(),
            database: MemoryDatabase::new(),
            setpoint: Setpoint::new(setpoint),
            running: Arc::new(AtomicBool::new(true)),
            state: create_shared_loop_state(),
        };
        let indicator = IndicatorDriver::new(
            Box::new(rig.red.clone()),
            Box::new(rig.blue.clone()),
            IndicatorConfig::default(),
        );
        let control_loop = ControlLoop::new(
            Box::new(rig.sensor.clone()),
            Box::new(rig.display.clone()),
            PidRegulator::new(&PidConfig::default(), rig.setpoint.clone()),
            indicator,
            LoopSettings::default(),
            rig.running.clone(),
            rig.state.clone(),
        )
        .with_telemetry(TelemetryReporter::new(Box::new(rig.serial.clone())))
        .with_persistence(PersistenceLogger::new(Box::new(rig.database.clone())));
        (control_loop, rig)
    }

    fn line2s(display: &MemoryDisplay) -> Vec<String> {
        display.log().frames.into_iter().map(|(_, line2)| line2).collect()
    }

    #[test]
    fn test_rotation_window() {
        let mut rotation = DisplayRotation::new(10);
        let phases: Vec<_> = (0..20).map(|_| rotation.advance()).collect();
        for (i, phase) in phases.iter().enumerate() {
            let position = i % 10 + 1;
            assert_eq!(phase.shows_temperature, position <= 5, "tick {}", i + 1);
            assert_eq!(phase.completes_window, position == 10, "tick {}", i + 1);
        }
    }

    #[tokio::test]
    async fn test_below_setpoint_lights_red() {
        let (mut control_loop, rig) = rig(ScriptedSensor::constant_fahrenheit(70.0), 72);
        let report = control_loop.tick().await;

        assert!(report.errors.is_empty());
        assert!(rig.red.level() > 0.0);
        assert_eq!(rig.blue.level(), 0.0);
        assert_eq!(report.line2, "Temp: 70.0");
    }

    #[tokio::test]
    async fn test_on_setpoint_shows_baseline() {
        let (mut control_loop, rig) = rig(ScriptedSensor::constant_fahrenheit(72.0), 72);
        control_loop.tick().await;

        assert_eq!(rig.red.level(), 0.2);
        assert_eq!(rig.blue.level(), 0.2);
    }

    #[tokio::test]
    async fn test_display_rotation_and_boundary_resync() {
        let (mut control_loop, rig) = rig(ScriptedSensor::constant_fahrenheit(70.0), 72);
        let mut boundaries = Vec::new();
        for _ in 0..20 {
            let report = control_loop.tick().await;
            if report.boundary_refresh {
                boundaries.push(report.tick);
            }
        }

        let lines = line2s(&rig.display);
        assert_eq!(lines.len(), 20);
        for (i, line) in lines.iter().enumerate() {
            if i % 10 < 5 {
                assert_eq!(line, "Temp: 70.0", "tick {}", i + 1);
            } else {
                assert_eq!(line, "Set Point: 72F", "tick {}", i + 1);
            }
        }
        assert_eq!(boundaries, vec![10, 20]);
        // One read per tick plus one per boundary resync
        assert_eq!(rig.sensor.reads(), 22);
        assert_eq!(control_loop.counters().indicator_refreshes, 22);
        for (line1, _) in rig.display.log().frames {
            assert_eq!(line1.len(), "MM/DD HH:MM:SS".len());
        }
    }

    #[tokio::test]
    async fn test_emission_cadence() {
        let (mut control_loop, rig) = rig(ScriptedSensor::constant_fahrenheit(70.0), 72);
        let mut telemetry_ticks = Vec::new();
        let mut persistence_ticks = Vec::new();
        for _ in 0..600 {
            let report = control_loop.tick().await;
            if report.telemetry_sent {
                telemetry_ticks.push(report.tick);
            }
            if report.record_persisted {
                persistence_ticks.push(report.tick);
            }
        }

        assert_eq!(telemetry_ticks, (1..=20).map(|i| i * 30).collect::<Vec<u64>>());
        assert_eq!(persistence_ticks, vec![300, 600]);
        for tick in &persistence_ticks {
            assert!(telemetry_ticks.contains(tick));
        }

        let lines = rig.serial.lines();
        assert_eq!(lines.len(), 20);
        assert!(lines[0].contains("\"temp\": 70.0, \"setPoint\": 72}"));
        assert!(rig.serial.contents().ends_with('\n'));

        let records = rig.database.records();
        assert_eq!(records.len(), 2);
        assert_relative_eq!(records[0].temperature, 70.0);
        assert_eq!(records[0].setpoint, 72);
    }

    #[tokio::test]
    async fn test_sensor_failure_keeps_indicator_and_last_value() {
        let (mut control_loop, rig) = rig(ScriptedSensor::new([Some(70.0), None]), 72);
        control_loop.tick().await;
        let before = control_loop.indicator().state();

        let report = control_loop.tick().await;
        assert_eq!(report.temperature, None);
        assert_eq!(report.control_signal, None);
        assert!(matches!(report.errors[..], [ThermostatError::SensorRead(_)]));
        assert_eq!(control_loop.indicator().state(), before);
        assert_eq!(report.line2, "Temp: 70.0");
        assert_eq!(rig.state.read().await.counters.sensor_errors, 1);
    }

    #[tokio::test]
    async fn test_non_finite_reading_is_a_sensor_error() {
        let mut sensor = MockTemperatureSensor::new();
        sensor.expect_read_raw().returning(|| Ok(f64::NAN));
        let (mut control_loop, rig) = rig(ScriptedSensor::failing(), 72);
        control_loop.sensor = Box::new(sensor);

        let report = control_loop.tick().await;
        assert!(matches!(report.errors[..], [ThermostatError::SensorRead(_)]));
        assert_eq!(rig.red.history(), Vec::<f64>::new());
    }

    #[tokio::test]
    async fn test_no_reading_yet_skips_emissions() {
        let (mut control_loop, rig) = rig(ScriptedSensor::failing(), 72);
        for _ in 0..30 {
            let report = control_loop.tick().await;
            assert!(!report.telemetry_sent);
        }

        assert_eq!(rig.display.last_frame().map(|(_, l2)| l2), Some("Set Point: 72F".into()));
        assert_eq!(line2s(&rig.display)[0], UNKNOWN_TEMPERATURE_LINE);
        assert_eq!(rig.serial.writes(), 0);
        // 30 tick reads plus 3 boundary resyncs
        assert_eq!(control_loop.counters().sensor_errors, 33);
    }

    #[tokio::test]
    async fn test_output_failures_are_recovered() {
        let (mut control_loop, rig) = rig(ScriptedSensor::constant_fahrenheit(75.0), 72);
        rig.display.set_failing(true);
        rig.serial.set_failing(true);
        rig.database.set_failing(true);

        for _ in 0..300 {
            control_loop.tick().await;
        }

        let counters = control_loop.counters();
        assert_eq!(counters.display_errors, 300);
        assert_eq!(counters.transport_errors, 10);
        assert_eq!(counters.persistence_errors, 1);
        assert_eq!(counters.telemetry_sent, 0);
        assert_eq!(rig.serial.writes(), 10);
        assert_eq!(rig.database.inserts(), 1);
        assert_eq!(control_loop.tick_count(), 300);
        // Regulation carries on regardless
        assert_eq!(rig.red.level(), 0.0);
        assert_eq!(rig.blue.level(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick() {
        let (control_loop, rig) = rig(ScriptedSensor::constant_fahrenheit(70.0), 72);
        let (_controller, commands) = SetpointController::new(rig.setpoint.clone());
        rig.running.store(false, Ordering::Relaxed);

        let counters = control_loop.run(commands).await;

        assert_eq!(rig.sensor.reads(), 0);
        assert!(rig.red.history().is_empty());
        let log = rig.display.log();
        assert!(log.frames.is_empty());
        assert_eq!(log.clears, 1);
        assert_eq!(counters.telemetry_sent, 0);
        assert_eq!(rig.state.read().await.status, LoopStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_termination_observed_at_tick_boundary() {
        let (control_loop, rig) = rig(ScriptedSensor::constant_fahrenheit(70.0), 72);
        let (_controller, commands) = SetpointController::new(rig.setpoint.clone());
        let handle = tokio::spawn(control_loop.run(commands));

        // Ticks at 0 s, 1 s and 2 s
        tokio::time::sleep(Duration::from_millis(2500)).await;
        rig.running.store(false, Ordering::Relaxed);
        handle.await.unwrap();

        assert_eq!(rig.sensor.reads(), 3);
        assert_eq!(rig.display.log().frames.len(), 3);
        assert_eq!(rig.display.log().clears, 1);
        let state = rig.state.read().await;
        assert_eq!(state.tick, 3);
        assert_eq!(state.status, LoopStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_setpoint_change_refreshes_before_next_tick() {
        let (control_loop, rig) = rig(ScriptedSensor::constant_fahrenheit(72.0), 72);
        let (controller, commands) = SetpointController::new(rig.setpoint.clone());
        let handle = tokio::spawn(control_loop.run(commands));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        {
            let state = rig.state.read().await;
            assert_eq!(state.tick, 2);
            assert_eq!(state.indicator, IndicatorState { red: 0.2, blue: 0.2 });
        }

        controller.increment();
        tokio::time::sleep(Duration::from_millis(100)).await;
        {
            let state = rig.state.read().await;
            assert_eq!(state.tick, 2, "refresh must not wait for the next tick");
            assert_eq!(state.setpoint, 73);
            assert_eq!(state.indicator, IndicatorState { red: 1.0, blue: 0.0 });
        }
        assert_eq!(rig.sensor.reads(), 3);

        rig.running.store(false, Ordering::Relaxed);
        handle.await.unwrap();
        assert_eq!(rig.display.last_frame().map(|(_, l2)| l2), Some("Temp: 72.0".into()));
    }
}
