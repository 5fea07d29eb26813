// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial telemetry reporter
//!
//! Fire-and-forget: a record is written once as a newline-terminated line and
//! a failed write is reported to the caller without retry.

use log::debug;

use super::drivers::SerialPort;
use super::records::TelemetryRecord;
use crate::error::ThermostatError;

/// Writes telemetry records to a serial link
pub struct TelemetryReporter {
    port: Box<dyn SerialPort>,
}

impl TelemetryReporter {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Serialize `record` and write it to the link
    pub async fn emit(&mut self, record: &TelemetryRecord) -> Result<(), ThermostatError> {
        let mut line = record.to_line();
        line.push('\n');
        self.port
            .write(line.as_bytes())
            .await
            .map_err(ThermostatError::transport)?;
        debug!("Telemetry sent: {}", line.trim_end());
        Ok(())
    }
}
