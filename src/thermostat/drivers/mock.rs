// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Mock drivers for simulation and testing
//!
//! Every driver here is a cheap handle: cloning it shares the underlying
//! state, so a test can hand one clone to the control loop and inspect the
//! other. Output drivers can be switched into a failing mode to exercise the
//! error paths of the loop.
//!
//! Recording drivers keep at most [`HISTORY_LIMIT`] entries and drop the
//! oldest ones first, so a long simulated run stays in bounded memory.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ButtonInput, Database, DisplayDriver, PressHandler, PwmChannel, SerialPort, TemperatureSensor};
use crate::config::SimulationConfig;
use crate::thermostat::celsius_from_fahrenheit;
use crate::thermostat::records::LogRecord;

/// Maximum number of entries a recording driver keeps
pub const HISTORY_LIMIT: usize = 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Append `entry`, evicting the oldest entries beyond [`HISTORY_LIMIT`]
fn record<T>(history: &Mutex<VecDeque<T>>, entry: T) {
    let mut history = lock(history);
    if history.len() >= HISTORY_LIMIT {
        history.pop_front();
    }
    history.push_back(entry);
}

/// Thermal cell relaxing toward ambient temperature with read noise
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    cell: Arc<Mutex<ThermalCell>>,
}

#[derive(Debug)]
struct ThermalCell {
    temperature_celsius: f64,
    ambient_celsius: f64,
    relaxation: f64,
    noise_celsius: f64,
}

impl SimulatedSensor {
    /// Create a simulated sensor
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            cell: Arc::new(Mutex::new(ThermalCell {
                temperature_celsius: config.initial_celsius,
                ambient_celsius: config.ambient_celsius,
                relaxation: config.relaxation.clamp(0.0, 1.0),
                noise_celsius: config.noise_celsius.abs(),
            })),
        }
    }

    /// Change the ambient temperature the cell relaxes toward
    pub fn set_ambient_temperature(&self, celsius: f64) {
        lock(&self.cell).ambient_celsius = celsius;
    }

    /// Current noiseless cell temperature in degrees Celsius
    pub fn cell_temperature(&self) -> f64 {
        lock(&self.cell).temperature_celsius
    }
}

#[async_trait]
impl TemperatureSensor for SimulatedSensor {
    async fn read_raw(&mut self) -> Result<f64> {
        let mut cell = lock(&self.cell);
        let gap = cell.ambient_celsius - cell.temperature_celsius;
        cell.temperature_celsius += gap * cell.relaxation;

        let noise = if cell.noise_celsius > 0.0 {
            rand::rng().random_range(-cell.noise_celsius..=cell.noise_celsius)
        } else {
            0.0
        };
        Ok(cell.temperature_celsius + noise)
    }
}

/// Sensor replaying a script of readings in degrees Fahrenheit.
///
/// `None` entries fail the read. Once the script is exhausted the last entry
/// repeats forever.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    script: Arc<Mutex<VecDeque<Option<f64>>>>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedSensor {
    /// Sensor replaying `readings`
    pub fn new(readings: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(readings.into_iter().collect())),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sensor always reporting `fahrenheit`
    pub fn constant_fahrenheit(fahrenheit: f64) -> Self {
        Self::new([Some(fahrenheit)])
    }

    /// Sensor that never answers
    pub fn failing() -> Self {
        Self::new([None])
    }

    /// Number of read attempts so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemperatureSensor for ScriptedSensor {
    async fn read_raw(&mut self) -> Result<f64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut script = lock(&self.script);
        let next = if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().copied().flatten()
        };
        next.map(celsius_from_fahrenheit)
            .ok_or_else(|| anyhow!("simulated sensor timeout"))
    }
}

/// Everything a [`MemoryDisplay`] was asked to do
#[derive(Debug, Default, Clone)]
pub struct DisplayLog {
    /// The most recent (line1, line2) pairs shown, oldest first
    pub frames: Vec<(String, String)>,
    /// Number of `clear` calls
    pub clears: usize,
}

/// Display keeping its recent frames in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDisplay {
    frames: Arc<Mutex<VecDeque<(String, String)>>>,
    clears: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemoryDisplay {
    /// Create an empty display
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail or succeed
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of the display history
    pub fn log(&self) -> DisplayLog {
        DisplayLog {
            frames: lock(&self.frames).iter().cloned().collect(),
            clears: self.clears.load(Ordering::SeqCst),
        }
    }

    /// Last frame shown
    pub fn last_frame(&self) -> Option<(String, String)> {
        lock(&self.frames).back().cloned()
    }
}

#[async_trait]
impl DisplayDriver for MemoryDisplay {
    async fn show(&mut self, line1: &str, line2: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated display fault"));
        }
        debug!("[display] {} | {}", line1, line2);
        record(&self.frames, (line1.to_string(), line2.to_string()));
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Serial port capturing its most recent writes
#[derive(Debug, Clone, Default)]
pub struct MemorySerialPort {
    written: Arc<Mutex<VecDeque<Vec<u8>>>>,
    writes: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemorySerialPort {
    /// Create an empty port
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail or succeed
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Retained writes concatenated, as text
    pub fn contents(&self) -> String {
        let bytes: Vec<u8> = lock(&self.written).iter().flatten().copied().collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Written text split into lines
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Number of write calls, successful or not
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SerialPort for MemorySerialPort {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated serial write timeout"));
        }
        record(&self.written, bytes.to_vec());
        Ok(())
    }
}

/// Database keeping records in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    records: Arc<Mutex<VecDeque<LogRecord>>>,
    inserts: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemoryDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent inserts fail or succeed
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Retained records, oldest first
    pub fn records(&self) -> Vec<LogRecord> {
        lock(&self.records).iter().cloned().collect()
    }

    /// Number of insert calls, successful or not
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn insert(&mut self, record: &LogRecord) -> Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated database outage"));
        }
        self::record(&self.records, record.clone());
        Ok(())
    }
}

/// PWM channel recording the levels it was set to
#[derive(Debug, Clone, Default)]
pub struct MemoryPwmChannel {
    history: Arc<Mutex<VecDeque<f64>>>,
}

impl MemoryPwmChannel {
    /// Create a channel that starts off
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level, `0.0` before any write
    pub fn level(&self) -> f64 {
        lock(&self.history).back().copied().unwrap_or(0.0)
    }

    /// Most recent levels written, oldest first
    pub fn history(&self) -> Vec<f64> {
        lock(&self.history).iter().copied().collect()
    }
}

impl PwmChannel for MemoryPwmChannel {
    fn set_level(&mut self, level: f64) -> Result<()> {
        record(&self.history, level);
        Ok(())
    }
}

/// Button pressed programmatically
#[derive(Clone, Default)]
pub struct VirtualButton {
    handlers: Arc<Mutex<Vec<PressHandler>>>,
}

impl VirtualButton {
    /// Create a button without handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a press, running every registered handler
    pub fn press(&self) {
        let handlers = lock(&self.handlers).clone();
        info!("Virtual button pressed ({} handlers)", handlers.len());
        for handler in handlers {
            handler();
        }
    }
}

impl ButtonInput for VirtualButton {
    fn on_press(&mut self, handler: PressHandler) -> Result<()> {
        lock(&self.handlers).push(handler);
        Ok(())
    }
}
