// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Hardware collaborators of the control loop
//!
//! This module defines the narrow interfaces the control core talks to and
//! provides two driver families:
//! - Mock: in-process simulation, used for tests and for running without hardware
//! - Native: Linux sysfs devices, a serial device file and file or Redis storage
//!
//! ```text
//!                      ControlLoop
//!                           ↓
//! ┌──────────────┬──────────────┬──────────────┬──────────────┬──────────────┐
//! │ Temperature  │   Display    │  SerialPort  │   Database   │  PwmChannel  │
//! │   Sensor     │   Driver     │              │              │  (x2)        │
//! └──────────────┴──────────────┴──────────────┴──────────────┴──────────────┘
//! ```

pub mod mock;
pub mod native;

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use super::records::LogRecord;
use crate::config::{Config, DriverType, PersistenceBackend};

/// Temperature sensor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemperatureSensor: Send {
    /// Read the current temperature in degrees Celsius
    async fn read_raw(&mut self) -> Result<f64>;
}

/// Two-line status display
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DisplayDriver: Send {
    /// Replace the display content with two lines
    async fn show(&mut self, line1: &str, line2: &str) -> Result<()>;

    /// Blank the display and release it
    async fn clear(&mut self) -> Result<()>;
}

/// Write-only serial link carrying telemetry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SerialPort: Send {
    /// Write all bytes to the link
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Document store receiving log records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send {
    /// Insert one record as one document
    async fn insert(&mut self, record: &LogRecord) -> Result<()>;
}

/// One dimmable indicator output
#[cfg_attr(test, mockall::automock)]
pub trait PwmChannel: Send {
    /// Set the brightness, `0.0` is off and `1.0` fully on
    fn set_level(&mut self, level: f64) -> Result<()>;
}

/// Callback invoked on a button press
pub type PressHandler = Arc<dyn Fn() + Send + Sync + 'static>;

/// Push button delivering press events asynchronously
pub trait ButtonInput: Send {
    /// Register `handler` to run on every press
    fn on_press(&mut self, handler: PressHandler) -> Result<()>;
}

/// Every collaborator the supervisor wires into the control loop
pub struct Collaborators {
    pub sensor: Box<dyn TemperatureSensor>,
    pub display: Box<dyn DisplayDriver>,
    pub red_channel: Box<dyn PwmChannel>,
    pub blue_channel: Box<dyn PwmChannel>,
    pub serial: Option<Box<dyn SerialPort>>,
    pub database: Option<Box<dyn Database>>,
    pub increase_button: Box<dyn ButtonInput>,
    pub decrease_button: Box<dyn ButtonInput>,
}

/// Create the collaborators selected by the configuration
pub async fn create_collaborators(config: &Config) -> Result<Collaborators> {
    let hardware = &config.hardware;

    let mut collaborators = match hardware.driver {
        DriverType::Mock => {
            info!("Using simulated hardware");
            // The simulated family still shows its frames on the console
            Collaborators {
                sensor: Box::new(mock::SimulatedSensor::new(&hardware.simulation)),
                display: Box::new(native::ConsoleDisplay::new()),
                red_channel: Box::new(mock::MemoryPwmChannel::new()),
                blue_channel: Box::new(mock::MemoryPwmChannel::new()),
                serial: None,
                database: None,
                increase_button: Box::new(mock::VirtualButton::new()),
                decrease_button: Box::new(mock::VirtualButton::new()),
            }
        }
        DriverType::Native => {
            info!("Using native hardware drivers");
            Collaborators {
                sensor: Box::new(native::SysfsTemperatureSensor::new(&hardware.sensor_path)),
                display: Box::new(native::ConsoleDisplay::new()),
                red_channel: Box::new(native::SysfsPwmChannel::open(
                    &hardware.red_pwm_path,
                    hardware.pwm_period_ns,
                )?),
                blue_channel: Box::new(native::SysfsPwmChannel::open(
                    &hardware.blue_pwm_path,
                    hardware.pwm_period_ns,
                )?),
                serial: None,
                database: None,
                increase_button: Box::new(native::SysfsGpioButton::new(
                    hardware.increase_button_gpio,
                    hardware.button_poll_ms,
                )),
                decrease_button: Box::new(native::SysfsGpioButton::new(
                    hardware.decrease_button_gpio,
                    hardware.button_poll_ms,
                )),
            }
        }
    };

    if config.telemetry.enabled {
        collaborators.serial = Some(match hardware.driver {
            DriverType::Mock => Box::new(mock::MemorySerialPort::new()),
            DriverType::Native => Box::new(native::SerialDevice::open(
                &config.telemetry.serial_device,
            )?),
        });
    }

    if config.persistence.enabled {
        let persistence = &config.persistence;
        collaborators.database = Some(match persistence.backend {
            PersistenceBackend::Memory => Box::new(mock::MemoryDatabase::new()),
            PersistenceBackend::JsonLines => {
                Box::new(native::JsonLinesDatabase::open(&persistence.path)?)
            }
            PersistenceBackend::Redis => Box::new(
                native::RedisDatabase::connect(&persistence.redis_url, &persistence.redis_key)
                    .await?,
            ),
        });
    }

    Ok(collaborators)
}
