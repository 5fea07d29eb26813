// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Temperature history logger
//!
//! Each record is inserted once as one document. A failed insert is reported
//! to the caller and the record is dropped.

use log::debug;

use super::drivers::Database;
use super::records::LogRecord;
use crate::error::ThermostatError;

/// Inserts log records into a database
pub struct PersistenceLogger {
    database: Box<dyn Database>,
}

impl PersistenceLogger {
    pub fn new(database: Box<dyn Database>) -> Self {
        Self { database }
    }

    /// Insert `record`
    pub async fn emit(&mut self, record: &LogRecord) -> Result<(), ThermostatError> {
        self.database
            .insert(record)
            .await
            .map_err(ThermostatError::persistence)?;
        debug!(
            "Persisted record: {} {:.1}F set point {}F",
            record.timestamp.to_rfc3339(),
            record.temperature,
            record.setpoint
        );
        Ok(())
    }
}
