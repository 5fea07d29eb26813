// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Two-channel temperature indicator
//!
//! The red channel lights up when the room is below the setpoint and the blue
//! channel when it is above, each with the PID output as brightness. On the
//! setpoint both channels glow at a fixed baseline level.
//!
//! Both the control loop and the supervisor write the indicator, so both
//! channels and the cached state live behind a single mutex and every refresh
//! updates the pair atomically.

use log::{debug, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::drivers::PwmChannel;
use crate::config::IndicatorConfig;

/// Indicator output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Channel {
    /// Lit when the temperature is below the setpoint
    Red,
    /// Lit when the temperature is above the setpoint
    Blue,
}

/// Brightness of both channels, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IndicatorState {
    pub red: f64,
    pub blue: f64,
}

impl IndicatorState {
    /// Both channels off
    pub const OFF: IndicatorState = IndicatorState {
        red: 0.0,
        blue: 0.0,
    };

    /// Target state for a reading compared with the setpoint
    pub fn for_reading(measured: f64, setpoint: i64, control_signal: f64, baseline: f64) -> Self {
        let setpoint = setpoint as f64;
        if measured < setpoint {
            Self {
                red: control_signal,
                blue: 0.0,
            }
        } else if measured > setpoint {
            Self {
                red: 0.0,
                blue: control_signal,
            }
        } else {
            Self {
                red: baseline,
                blue: baseline,
            }
        }
    }

    /// Level of one channel
    pub fn level(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Red => self.red,
            Channel::Blue => self.blue,
        }
    }
}

struct IndicatorOutputs {
    red: Box<dyn PwmChannel>,
    blue: Box<dyn PwmChannel>,
    state: IndicatorState,
    shut_down: bool,
}

impl IndicatorOutputs {
    fn write(&mut self, channel: Channel, level: f64) {
        let output = match channel {
            Channel::Red => &mut self.red,
            Channel::Blue => &mut self.blue,
        };
        if let Err(e) = output.set_level(level) {
            warn!("Failed to set {:?} indicator to {:.3}: {:#}", channel, level, e);
        }
        match channel {
            Channel::Red => self.state.red = level,
            Channel::Blue => self.state.blue = level,
        }
    }
}

/// Shared handle on the red/blue indicator
#[derive(Clone)]
pub struct IndicatorDriver {
    outputs: Arc<Mutex<IndicatorOutputs>>,
    config: IndicatorConfig,
}

impl IndicatorDriver {
    /// Create a driver over two PWM channels, both initially off
    pub fn new(red: Box<dyn PwmChannel>, blue: Box<dyn PwmChannel>, config: IndicatorConfig) -> Self {
        Self {
            outputs: Arc::new(Mutex::new(IndicatorOutputs {
                red,
                blue,
                state: IndicatorState::OFF,
                shut_down: false,
            })),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndicatorOutputs> {
        self.outputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set one channel; ignored once the indicator is shut down
    pub fn set_intensity(&self, channel: Channel, level: f64) {
        let mut outputs = self.lock();
        if outputs.shut_down {
            debug!("Indicator shut down, ignoring {:?} = {:.3}", channel, level);
            return;
        }
        outputs.write(channel, level.clamp(0.0, 1.0));
    }

    /// Turn both channels off. Idempotent, allowed after shutdown.
    pub fn clear(&self) {
        let mut outputs = self.lock();
        outputs.write(Channel::Red, 0.0);
        outputs.write(Channel::Blue, 0.0);
    }

    /// Turn both channels off and reject every later write except [`clear`](Self::clear)
    pub fn shutdown(&self) {
        let mut outputs = self.lock();
        outputs.shut_down = true;
        outputs.write(Channel::Red, 0.0);
        outputs.write(Channel::Blue, 0.0);
        info!("Indicator cleared for shutdown");
    }

    /// Whether [`shutdown`](Self::shutdown) was called
    pub fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }

    /// Apply the indicator rule for a reading.
    ///
    /// Returns the state written, or `None` when the indicator is shut down.
    pub fn refresh(&self, measured: f64, setpoint: i64, control_signal: f64) -> Option<IndicatorState> {
        let target = IndicatorState::for_reading(
            measured,
            setpoint,
            control_signal.clamp(0.0, 1.0),
            self.config.baseline_level,
        );

        // The hysteresis margin is reported only, it does not gate the update
        let diff = (measured - setpoint as f64).abs();
        debug!(
            "Indicator refresh: temp {:.2}, set point {}, diff {:.2} (hysteresis {:.2}), red {:.3}, blue {:.3}",
            measured, setpoint, diff, self.config.hysteresis, target.red, target.blue
        );

        let mut outputs = self.lock();
        if outputs.shut_down {
            debug!("Indicator shut down, refresh skipped");
            return None;
        }
        outputs.write(Channel::Red, target.red);
        outputs.write(Channel::Blue, target.blue);
        Some(outputs.state)
    }

    /// Current state of both channels
    pub fn state(&self) -> IndicatorState {
        self.lock().state
    }
}

impl std::fmt::Debug for IndicatorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorDriver")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thermostat::drivers::mock::MemoryPwmChannel;
    use crate::thermostat::drivers::MockPwmChannel;

    fn driver() -> (IndicatorDriver, MemoryPwmChannel, MemoryPwmChannel) {
        let red = MemoryPwmChannel::new();
        let blue = MemoryPwmChannel::new();
        let driver = IndicatorDriver::new(
            Box::new(red.clone()),
            Box::new(blue.clone()),
            IndicatorConfig::default(),
        );
        (driver, red, blue)
    }

    #[test]
    fn test_exactly_one_channel_off_setpoint() {
        let signals = [0.0, 0.05, 0.5, 1.0];
        let readings = [-10.0, 60.0, 71.9, 72.1, 90.0];
        for &signal in &signals {
            for &measured in &readings {
                let state = IndicatorState::for_reading(measured, 72, signal, 0.2);
                if measured < 72.0 {
                    assert_eq!((state.red, state.blue), (signal, 0.0));
                } else {
                    assert_eq!((state.red, state.blue), (0.0, signal));
                }
            }
        }
    }

    #[test]
    fn test_baseline_on_setpoint() {
        for signal in [0.0, 0.7, 1.0] {
            let state = IndicatorState::for_reading(72.0, 72, signal, 0.2);
            assert_eq!(state, IndicatorState { red: 0.2, blue: 0.2 });
        }
    }

    #[test]
    fn test_refresh_writes_both_channels() {
        let (driver, red, blue) = driver();
        let state = driver.refresh(70.0, 72, 0.8).unwrap();
        assert_eq!(state, IndicatorState { red: 0.8, blue: 0.0 });
        assert_eq!(red.level(), 0.8);
        assert_eq!(blue.level(), 0.0);

        driver.refresh(75.0, 72, 0.3);
        assert_eq!(red.level(), 0.0);
        assert_eq!(blue.level(), 0.3);
    }

    #[test]
    fn test_set_intensity_clamps() {
        let (driver, red, blue) = driver();
        driver.set_intensity(Channel::Red, 1.5);
        driver.set_intensity(Channel::Blue, -0.5);
        assert_eq!(red.level(), 1.0);
        assert_eq!(blue.level(), 0.0);
        assert_eq!(driver.state().level(Channel::Red), 1.0);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (driver, red, blue) = driver();
        driver.refresh(70.0, 72, 1.0);
        driver.clear();
        driver.clear();
        assert_eq!(driver.state(), IndicatorState::OFF);
        assert_eq!(red.history(), vec![1.0, 0.0, 0.0]);
        assert_eq!(blue.history(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_only_clear_after_shutdown() {
        let (driver, red, _blue) = driver();
        driver.refresh(70.0, 72, 1.0);
        driver.shutdown();
        assert!(driver.is_shut_down());

        assert_eq!(driver.refresh(70.0, 72, 1.0), None);
        driver.set_intensity(Channel::Red, 0.9);
        assert_eq!(red.level(), 0.0);

        driver.clear();
        assert_eq!(driver.state(), IndicatorState::OFF);
    }

    #[test]
    fn test_channel_failure_does_not_block_other_channel() {
        let mut failing_red = MockPwmChannel::new();
        failing_red
            .expect_set_level()
            .returning(|_| Err(anyhow::anyhow!("pwm export missing")));
        let blue = MemoryPwmChannel::new();
        let driver = IndicatorDriver::new(
            Box::new(failing_red),
            Box::new(blue.clone()),
            IndicatorConfig::default(),
        );

        driver.refresh(75.0, 72, 0.4);
        assert_eq!(blue.level(), 0.4);
    }

    #[test]
    fn test_concurrent_refreshes_never_interleave() {
        let (driver, _red, _blue) = driver();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let driver = driver.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        if i % 2 == 0 {
                            driver.refresh(70.0, 72, 0.6);
                        } else {
                            driver.refresh(74.0, 72, 0.3);
                        }
                        let state = driver.state();
                        assert!(
                            state == IndicatorState { red: 0.6, blue: 0.0 }
                                || state == IndicatorState { red: 0.0, blue: 0.3 },
                            "torn indicator state {:?}",
                            state
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
