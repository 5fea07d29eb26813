// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Telemetry and log records
//!
//! Both records are immutable values built and consumed within one tick.
//! Serialization is pure and independent of the transport that carries it.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::round_one_decimal;

/// Timestamp format of the telemetry line
pub const TELEMETRY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Status record sent over the serial link
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// Local time the record was built
    pub timestamp: DateTime<Local>,
    /// Temperature in degrees Fahrenheit
    pub temperature: f64,
    /// Setpoint in degrees Fahrenheit
    pub setpoint: i64,
}

impl TelemetryRecord {
    /// Build a record
    pub fn new(timestamp: DateTime<Local>, temperature: f64, setpoint: i64) -> Self {
        Self {
            timestamp,
            temperature,
            setpoint,
        }
    }

    /// Serialize to one compact line, without the trailing newline.
    ///
    /// ```
    /// use chrono::{Local, TimeZone};
    /// use rust_thermostat::thermostat::TelemetryRecord;
    ///
    /// let timestamp = Local.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap();
    /// let record = TelemetryRecord::new(timestamp, 70.26, 72);
    /// assert_eq!(
    ///     record.to_line(),
    ///     r#"{"timestamp": "2025-03-14 15:09:26", "temp": 70.3, "setPoint": 72}"#
    /// );
    /// ```
    pub fn to_line(&self) -> String {
        format!(
            "{{\"timestamp\": \"{}\", \"temp\": {:.1}, \"setPoint\": {}}}",
            self.timestamp.format(TELEMETRY_TIMESTAMP_FORMAT),
            round_one_decimal(self.temperature),
            self.setpoint
        )
    }
}

/// History record stored in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Local time the record was built, full precision
    pub timestamp: DateTime<Local>,
    /// Temperature in degrees Fahrenheit, one decimal
    pub temperature: f64,
    /// Setpoint in degrees Fahrenheit
    #[serde(rename = "setPoint")]
    pub setpoint: i64,
}

impl LogRecord {
    /// Build a record, rounding the temperature to one decimal
    pub fn new(timestamp: DateTime<Local>, temperature: f64, setpoint: i64) -> Self {
        Self {
            timestamp,
            temperature: round_one_decimal(temperature),
            setpoint,
        }
    }

    /// Serialize to a JSON document
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timestamp() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
            .single()
            .expect("unambiguous local time")
    }

    #[test]
    fn test_telemetry_line_format() {
        let record = TelemetryRecord::new(timestamp(), 70.0, 72);
        assert_eq!(
            record.to_line(),
            r#"{"timestamp": "2025-01-02 03:04:05", "temp": 70.0, "setPoint": 72}"#
        );
    }

    #[test]
    fn test_telemetry_line_is_valid_json() {
        let record = TelemetryRecord::new(timestamp(), 68.449, -3);
        let value: serde_json::Value = serde_json::from_str(&record.to_line()).unwrap();
        assert_eq!(value["timestamp"], "2025-01-02 03:04:05");
        assert_eq!(value["temp"], 68.4);
        assert_eq!(value["setPoint"], -3);
        assert!(!record.to_line().contains('\n'));
    }

    #[test]
    fn test_log_record_document() {
        let record = LogRecord::new(timestamp(), 71.96, 72);
        assert_eq!(record.temperature, 72.0);

        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["temperature"], 72.0);
        assert_eq!(value["setPoint"], 72);
        let parsed: DateTime<Local> = value["timestamp"].as_str().unwrap().parse().unwrap();
        assert_eq!(parsed, record.timestamp);
    }

    #[test]
    fn test_log_record_keeps_sub_second_precision() {
        let now = Local::now();
        let record = LogRecord::new(now, 70.0, 72);
        let json = record.to_json().unwrap();
        let back: LogRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timestamp, now);
    }
}
