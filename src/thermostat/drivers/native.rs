// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Native drivers for Linux hosts
//!
//! The sensor, the indicator channels and the buttons go through the kernel
//! sysfs interfaces (IIO, PWM and legacy GPIO). Telemetry is written to a
//! serial device file. Log records go to a JSON-lines file or to a Redis
//! list.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

use super::{ButtonInput, Database, DisplayDriver, PressHandler, PwmChannel, SerialPort, TemperatureSensor};
use crate::thermostat::records::LogRecord;

/// Default root of the legacy sysfs GPIO interface
pub const GPIO_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Temperature from a sysfs attribute holding milli-degrees Celsius
#[derive(Debug, Clone)]
pub struct SysfsTemperatureSensor {
    path: PathBuf,
}

impl SysfsTemperatureSensor {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl TemperatureSensor for SysfsTemperatureSensor {
    async fn read_raw(&mut self) -> Result<f64> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let millidegrees: f64 = contents
            .trim()
            .parse()
            .with_context(|| format!("Invalid temperature value {:?}", contents.trim()))?;
        Ok(millidegrees / 1000.0)
    }
}

/// Two-line display rendered to the log
#[derive(Debug, Clone, Default)]
pub struct ConsoleDisplay {
    last: Option<(String, String)>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DisplayDriver for ConsoleDisplay {
    async fn show(&mut self, line1: &str, line2: &str) -> Result<()> {
        let frame = (line1.to_string(), line2.to_string());
        // Only the second line is worth logging when the clock is the only change
        if self.last.as_ref().map(|(_, l2)| l2.as_str()) != Some(line2) {
            info!("[display] {:<16}|{:<16}", line1, line2);
        } else {
            debug!("[display] {:<16}|{:<16}", line1, line2);
        }
        self.last = Some(frame);
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.last = None;
        info!("[display] cleared");
        Ok(())
    }
}

/// One channel of a sysfs PWM chip, e.g. `/sys/class/pwm/pwmchip0/pwm0`.
///
/// The channel must already be exported.
#[derive(Debug)]
pub struct SysfsPwmChannel {
    path: PathBuf,
    period_ns: u64,
}

impl SysfsPwmChannel {
    /// Program the period and enable the channel with a zero duty cycle
    pub fn open<P: AsRef<Path>>(path: P, period_ns: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(anyhow!(
                "PWM channel {} is not exported",
                path.display()
            ));
        }
        let channel = Self { path, period_ns };
        // The duty cycle must not exceed the period while the period changes
        channel.write_attribute("duty_cycle", 0)?;
        channel.write_attribute("period", period_ns)?;
        channel.write_attribute("enable", 1)?;
        info!(
            "PWM channel {} enabled with period {} ns",
            channel.path.display(),
            period_ns
        );
        Ok(channel)
    }

    fn write_attribute(&self, name: &str, value: u64) -> Result<()> {
        let attribute = self.path.join(name);
        std::fs::write(&attribute, value.to_string())
            .with_context(|| format!("Failed to write {}", attribute.display()))
    }

    /// Duty cycle in nanoseconds for a brightness level
    fn duty_cycle_ns(&self, level: f64) -> u64 {
        (level.clamp(0.0, 1.0) * self.period_ns as f64).round() as u64
    }
}

impl PwmChannel for SysfsPwmChannel {
    fn set_level(&mut self, level: f64) -> Result<()> {
        self.write_attribute("duty_cycle", self.duty_cycle_ns(level))
    }
}

/// Active-low push button on a sysfs GPIO line, polled by a background task
#[derive(Debug)]
pub struct SysfsGpioButton {
    value_path: PathBuf,
    poll_interval: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl SysfsGpioButton {
    pub fn new(gpio: u32, poll_ms: u64) -> Self {
        Self::with_root(GPIO_SYSFS_ROOT, gpio, poll_ms)
    }

    /// Button on a GPIO line under an alternative sysfs root
    pub fn with_root<P: AsRef<Path>>(root: P, gpio: u32, poll_ms: u64) -> Self {
        Self {
            value_path: root.as_ref().join(format!("gpio{}", gpio)).join("value"),
            poll_interval: Duration::from_millis(poll_ms.max(1)),
            tasks: Vec::new(),
        }
    }
}

async fn read_line_level(path: &Path) -> Result<bool> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match contents.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(anyhow!("Unexpected GPIO value {:?}", other)),
    }
}

impl ButtonInput for SysfsGpioButton {
    fn on_press(&mut self, handler: PressHandler) -> Result<()> {
        let path = self.value_path.clone();
        let poll_interval = self.poll_interval;
        if !path.exists() {
            return Err(anyhow!("GPIO line {} is not exported", path.display()));
        }

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            let mut previous = true;
            let mut reported_error = false;
            loop {
                interval.tick().await;
                match read_line_level(&path).await {
                    Ok(level) => {
                        reported_error = false;
                        // Pressed on the falling edge of the pulled-up line
                        if previous && !level {
                            debug!("Button {} pressed", path.display());
                            handler();
                        }
                        previous = level;
                    }
                    Err(e) if !reported_error => {
                        warn!("Button polling failed: {:#}", e);
                        reported_error = true;
                    }
                    Err(_) => {}
                }
            }
        });
        self.tasks.push(task);
        Ok(())
    }
}

impl Drop for SysfsGpioButton {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Serial link backed by a character device file
#[derive(Debug)]
pub struct SerialDevice {
    path: PathBuf,
    file: File,
}

impl SerialDevice {
    /// Open the device for writing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open serial device {}", path.display()))?;
        info!("Telemetry serial device {} opened", path.display());
        Ok(Self {
            path,
            file: File::from_std(file),
        })
    }
}

#[async_trait]
impl SerialPort for SerialDevice {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .await
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        self.file.flush().await?;
        Ok(())
    }
}

/// Append-only file with one JSON document per line
#[derive(Debug)]
pub struct JsonLinesDatabase {
    path: PathBuf,
    file: File,
}

impl JsonLinesDatabase {
    /// Open `path` for appending, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        info!("Logging temperature records to {}", path.display());
        Ok(Self {
            path,
            file: File::from_std(file),
        })
    }
}

#[async_trait]
impl Database for JsonLinesDatabase {
    async fn insert(&mut self, record: &LogRecord) -> Result<()> {
        let mut document = record.to_json()?;
        document.push('\n');
        self.file
            .write_all(document.as_bytes())
            .await
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        self.file.flush().await?;
        Ok(())
    }
}

/// Redis list receiving one JSON document per record
pub struct RedisDatabase {
    client: Client,
    key: String,
    connection: Option<MultiplexedConnection>,
}

impl RedisDatabase {
    /// Connect to `url` and verify the server answers
    pub async fn connect(url: &str, key: &str) -> Result<Self> {
        let client = Client::open(url).with_context(|| format!("Invalid Redis URL {}", url))?;
        let mut database = Self {
            client,
            key: key.to_string(),
            connection: None,
        };
        let conn = database.get_connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(conn)
            .await
            .context("Redis connection test failed")?;
        info!("Logging temperature records to Redis list '{}'", key);
        Ok(database)
    }

    async fn get_connection(&mut self) -> Result<&mut MultiplexedConnection> {
        if self.connection.is_none() {
            let conn = self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| {
                    error!("Redis connection error: {}", e);
                    anyhow!("Redis connection error: {}", e)
                })?;
            self.connection = Some(conn);
        }
        self.connection
            .as_mut()
            .ok_or_else(|| anyhow!("Redis connection unavailable"))
    }
}

#[async_trait]
impl Database for RedisDatabase {
    async fn insert(&mut self, record: &LogRecord) -> Result<()> {
        let document = record.to_json()?;
        let key = self.key.clone();
        let conn = self.get_connection().await?;
        let result: redis::RedisResult<()> = conn.rpush(&key, &document).await;
        if let Err(e) = result {
            // Reconnect on the next insert
            self.connection = None;
            return Err(anyhow!("Redis RPUSH to '{}' failed: {}", key, e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sysfs_sensor_reads_millidegrees() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("in_temp_input");
        std::fs::write(&path, "21500\n")?;

        let mut sensor = SysfsTemperatureSensor::new(&path);
        assert_eq!(sensor.read_raw().await?, 21.5);

        std::fs::write(&path, "garbage")?;
        assert!(sensor.read_raw().await.is_err());
        std::fs::remove_file(&path)?;
        assert!(sensor.read_raw().await.is_err());
        Ok(())
    }

    #[test]
    fn test_pwm_channel_writes_duty_cycle() -> Result<()> {
        let dir = tempdir()?;
        let mut channel = SysfsPwmChannel::open(dir.path(), 1_000_000)?;
        assert_eq!(std::fs::read_to_string(dir.path().join("period"))?, "1000000");
        assert_eq!(std::fs::read_to_string(dir.path().join("enable"))?, "1");

        channel.set_level(0.25)?;
        assert_eq!(std::fs::read_to_string(dir.path().join("duty_cycle"))?, "250000");
        channel.set_level(3.0)?;
        assert_eq!(std::fs::read_to_string(dir.path().join("duty_cycle"))?, "1000000");
        Ok(())
    }

    #[test]
    fn test_pwm_channel_requires_export() {
        let dir = tempdir().unwrap();
        assert!(SysfsPwmChannel::open(dir.path().join("pwm7"), 1_000_000).is_err());
    }

    #[tokio::test]
    async fn test_gpio_button_fires_on_falling_edge() -> Result<()> {
        let dir = tempdir()?;
        let line = dir.path().join("gpio25");
        std::fs::create_dir(&line)?;
        std::fs::write(line.join("value"), "1\n")?;

        let presses = Arc::new(AtomicUsize::new(0));
        let counter = presses.clone();
        let mut button = SysfsGpioButton::with_root(dir.path(), 25, 5);
        button.on_press(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))?;

        tokio::time::sleep(Duration::from_millis(30)).await;
        std::fs::write(line.join("value"), "0\n")?;
        for _ in 0..200 {
            if presses.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // Holding the button down is a single press
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(presses.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_gpio_button_requires_export() {
        let dir = tempdir().unwrap();
        let mut button = SysfsGpioButton::with_root(dir.path(), 12, 5);
        assert!(button.on_press(Arc::new(|| {})).is_err());
    }

    #[tokio::test]
    async fn test_serial_device_appends_bytes() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ttyS0");
        std::fs::write(&path, "")?;

        let mut port = SerialDevice::open(&path)?;
        port.write(b"first\n").await?;
        port.write(b"second\n").await?;
        assert_eq!(std::fs::read_to_string(&path)?, "first\nsecond\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_json_lines_database_appends_documents() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("logs.jsonl");

        let first = LogRecord::new(Local::now(), 70.04, 72);
        let second = LogRecord::new(Local::now(), 71.06, 73);
        {
            let mut database = JsonLinesDatabase::open(&path)?;
            database.insert(&first).await?;
        }
        let mut database = JsonLinesDatabase::open(&path)?;
        database.insert(&second).await?;

        let contents = std::fs::read_to_string(&path)?;
        let stored: Vec<LogRecord> = contents
            .lines()
            .map(serde_json::from_str)
            .collect::<serde_json::Result<_>>()?;
        assert_eq!(stored, vec![first, second]);
        Ok(())
    }

    #[tokio::test]
    async fn test_redis_connect_fails_without_server() {
        // Port 1 is never a Redis server
        let result = RedisDatabase::connect("redis://127.0.0.1:1", "thermostat:test").await;
        assert!(result.is_err());
    }
}
