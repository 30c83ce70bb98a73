//! System configuration parameters
//!
//! All tunable parameters for the acquisition loop: the multiplexer address,
//! the per-sensor register settings, and the two polling policies (arbiter
//! drain-wait and forced-mode measuring wait). Defaults mirror the values the
//! deployed installation ran with.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mux::MAX_CHANNEL;

/// BME280 operating mode: one conversion per trigger, then back to sleep.
pub const MODE_FORCED: u8 = 2;
/// BME280 operating mode: free-running conversions at the standby interval.
pub const MODE_NORMAL: u8 = 3;

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// I2C address of the TCA9548A multiplexer.
    pub multiplexer_address: u8,
    /// Host I2C bus number; `None` uses the platform default bus.
    #[serde(default)]
    pub i2c_bus: Option<u8>,
    /// Seconds between full update passes.
    pub update_interval_secs: u32,
    /// Channel drain-wait policy.
    pub arbiter: ArbiterConfig,
    /// Forced-mode measuring-bit wait policy (shared by all sessions).
    pub measure_poll: MeasurePollConfig,
    /// One entry per attached BME280.
    pub sensors: Vec<SensorConfig>,
}

/// Per-sensor settings: bus placement plus the three register images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// I2C address of the sensor (0x76 or 0x77 on real hardware).
    pub address: u8,
    /// Multiplexer channel the sensor sits behind (0–7).
    pub channel: u8,
    /// Temperature oversampling (0 = skipped, 1–5 = x1..x16).
    pub oversampling_temperature: u8,
    /// Pressure oversampling. 0 disables the pressure channel entirely.
    pub oversampling_pressure: u8,
    /// Humidity oversampling. 0 disables the humidity channel entirely.
    pub oversampling_humidity: u8,
    /// Operating mode: [`MODE_NORMAL`] or [`MODE_FORCED`].
    pub operation_mode: u8,
    /// Normal-mode standby time code (0–7).
    pub time_standby: u8,
    /// IIR filter coefficient code (0 = off).
    pub filter_mode: u8,
    /// Self-heating correction added to the compensated temperature, °C.
    pub delta_temperature: f64,
}

/// How long a session waits for another channel's users to drain.
///
/// The deployed protocol polled a shared counter with a fixed sleep; both
/// knobs are explicit here so the race is testable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArbiterConfig {
    /// Poll attempts before the forced takeover.
    pub max_wait_polls: u32,
    /// Delay between poll attempts, milliseconds.
    pub poll_interval_ms: u64,
}

/// How long a session waits for the forced-mode measuring bit to clear.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeasurePollConfig {
    /// Status-register polls before the cycle faults with a timeout.
    pub max_polls: u32,
    /// Delay between status polls, milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            multiplexer_address: 0x70,
            i2c_bus: None,
            update_interval_secs: 30,
            arbiter: ArbiterConfig::default(),
            measure_poll: MeasurePollConfig::default(),
            sensors: Vec::new(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            address: 0x76,
            channel: 0,
            oversampling_temperature: 1,
            oversampling_pressure: 1,
            oversampling_humidity: 1,
            operation_mode: MODE_NORMAL,
            time_standby: 5,
            filter_mode: 0,
            delta_temperature: 0.0,
        }
    }
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            max_wait_polls: 20,
            poll_interval_ms: 500,
        }
    }
}

impl Default for MeasurePollConfig {
    fn default() -> Self {
        Self {
            max_polls: 20,
            poll_interval_ms: 100,
        }
    }
}

impl SensorConfig {
    /// Reject settings the hardware cannot express before any bus traffic.
    pub fn validate(&self) -> Result<()> {
        if self.channel > MAX_CHANNEL {
            return Err(Error::InvalidChannel(self.channel));
        }
        Ok(())
    }

    /// Whether the pressure channel is enabled.
    pub fn with_pressure(&self) -> bool {
        self.oversampling_pressure > 0
    }

    /// Whether the humidity channel is enabled.
    pub fn with_humidity(&self) -> bool {
        self.oversampling_humidity > 0
    }
}
