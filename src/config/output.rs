// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Telemetry and persistence output configuration

use serde::{Deserialize, Serialize};

/// Serial telemetry configuration.
///
/// The serial device is expected to be configured (baud rate, framing) outside
/// of this program, for instance with `stty`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Enable or disable the serial telemetry link
    pub enabled: bool,

    /// Serial device the telemetry lines are written to.
    ///
    /// With the mock driver the lines are kept in memory instead.
    pub serial_device: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            serial_device: "/dev/ttyS0".to_string(),
        }
    }
}

/// Storage backend for log records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceBackend {
    /// Keep records in memory
    Memory,
    /// Append one JSON document per line to a file
    JsonLines,
    /// Push JSON documents onto a Redis list
    Redis,
}

/// Log record persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Enable or disable persistence
    pub enabled: bool,

    /// Storage backend
    pub backend: PersistenceBackend,

    /// Output file of the `json_lines` backend
    pub path: String,

    /// Connection URL of the `redis` backend
    pub redis_url: String,

    /// List key of the `redis` backend
    pub redis_key: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: PersistenceBackend::JsonLines,
            path: "temperature_logs.jsonl".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_key: "thermostat_data:temperature_logs".to_string(),
        }
    }
}
