//! Per-sensor update session: register programming, measurement triggering,
//! raw reads, compensation, and plausibility validation.
//!
//! One update cycle walks `Configuring → (forced: Triggering ⇄ PollingReady)
//! → ReadingRaw → Compensating → Ready | Faulted`. Configuration (and
//! calibration population) runs on the first update and again after any
//! faulted cycle. A transport error anywhere faults the cycle immediately
//! and skips compensation; previously published values are retained until a
//! future cycle succeeds.
//!
//! The session owns no bus: the caller passes the locked bus in, and must
//! bracket the whole call with the channel arbiter's acquire/release so the
//! multiplexer cannot be switched mid-read.

use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::bus::I2cBus;
use crate::config::{MeasurePollConfig, SensorConfig, MODE_FORCED};
use crate::error::{Error, ReadingKind, Result, TransportError};
use crate::sensor::calibration::CalibrationData;
use crate::sensor::{compensation, registers, RawSample, SensorReading};

/// Plausibility bounds (°C, hPa). Humidity is bounded by its clamp range.
const TEMP_MIN_C: f64 = -20.0;
const TEMP_MAX_C: f64 = 80.0;
const PRESSURE_MIN_HPA: f64 = 100.0;

/// Persistent session condition between update cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never configured; the first update will program the registers.
    Uninitialized,
    /// Last cycle passed every enabled plausibility bound.
    Ready,
    /// Last cycle failed; the next update reconfigures from scratch.
    Faulted,
}

pub struct SensorSession {
    config: SensorConfig,
    poll: MeasurePollConfig,
    /// Precomputed register images.
    ctrl_meas: u8,
    config_reg: u8,
    ctrl_hum: u8,
    calibration: Option<CalibrationData>,
    state: SessionState,
    /// Last published values — retained across faulted cycles.
    temperature: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<f64>,
}

impl SensorSession {
    pub fn new(config: SensorConfig, poll: MeasurePollConfig) -> Self {
        let ctrl_meas = registers::ctrl_meas(
            config.oversampling_temperature,
            config.oversampling_pressure,
            config.operation_mode,
        );
        let config_reg = registers::config(config.time_standby, config.filter_mode, false);
        let ctrl_hum = registers::ctrl_hum(config.oversampling_humidity);
        Self {
            config,
            poll,
            ctrl_meas,
            config_reg,
            ctrl_hum,
            calibration: None,
            state: SessionState::Uninitialized,
            temperature: None,
            pressure: None,
            humidity: None,
        }
    }

    /// Stable identifier used as the key in the published map.
    pub fn id(&self) -> String {
        format!("sensor_{}_{:#04x}", self.config.channel, self.config.address)
    }

    pub fn channel(&self) -> u8 {
        self.config.channel
    }

    pub fn address(&self) -> u8 {
        self.config.address
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ok(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Last published values plus the cycle-global ok flag.
    pub fn reading(&self) -> SensorReading {
        SensorReading {
            temperature: self.temperature,
            pressure: self.pressure,
            humidity: self.humidity,
            ok: self.is_ok(),
        }
    }

    /// Run one full update cycle. The caller must already hold the
    /// arbiter grant for this sensor's channel with the multiplexer
    /// switched.
    pub fn update(&mut self, bus: &mut dyn I2cBus) -> Result<()> {
        match self.run_cycle(bus) {
            Ok(()) => {
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!("sensor {}: bad update: {e}", self.id());
                self.state = SessionState::Faulted;
                Err(e)
            }
        }
    }

    fn run_cycle(&mut self, bus: &mut dyn I2cBus) -> Result<()> {
        if self.state != SessionState::Ready {
            self.configure(bus)?;
        }
        if self.config.operation_mode == MODE_FORCED {
            self.trigger_forced(bus)?;
        }
        let raw = self.read_raw(bus)?;
        self.compensate_and_validate(raw)
    }

    /// Program ctrl_hum, config, and ctrl_meas, then populate calibration.
    fn configure(&mut self, bus: &mut dyn I2cBus) -> Result<()> {
        let addr = self.config.address;
        debug!("sensor {}: configuring", self.id());
        bus.write_byte(addr, registers::CTRL_HUM, self.ctrl_hum)?;
        bus.write_byte(addr, registers::CONFIG, self.config_reg)?;
        bus.write_byte(addr, registers::CTRL_MEAS, self.ctrl_meas)?;
        self.calibration = Some(CalibrationData::populate(bus, &self.config)?);
        Ok(())
    }

    /// Forced mode: rewrite ctrl_meas to trigger one conversion, then poll
    /// the measuring bit until it clears, bounded by the configured budget.
    fn trigger_forced(&mut self, bus: &mut dyn I2cBus) -> Result<()> {
        let addr = self.config.address;
        bus.write_byte(addr, registers::CTRL_MEAS, self.ctrl_meas)?;
        for _ in 0..=self.poll.max_polls {
            let status = bus.read_byte(addr, registers::STATUS)?;
            if status & registers::STATUS_MEASURING == 0 {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(self.poll.poll_interval_ms));
        }
        Err(TransportError::MeasurementTimeout { addr }.into())
    }

    fn read_raw(&self, bus: &mut dyn I2cBus) -> Result<RawSample> {
        let mut block = [0u8; registers::DATA_LEN];
        bus.read_block(self.config.address, registers::DATA, &mut block)?;
        Ok(RawSample::from_block(&block))
    }

    /// Compensate all enabled channels and check plausibility bounds.
    ///
    /// Each field that passes its own bound is published even when another
    /// field fails, but the ok flag is cycle-global: one implausible value
    /// faults the whole cycle.
    fn compensate_and_validate(&mut self, raw: RawSample) -> Result<()> {
        let calib = self.calibration.as_ref().ok_or(Error::CalibrationUnavailable)?;

        let (temperature, t_fine) = compensation::compensate_temperature(
            raw.temperature,
            calib,
            self.config.delta_temperature,
        );

        let mut failed = None;
        if (TEMP_MIN_C..TEMP_MAX_C).contains(&temperature) {
            self.temperature = Some(temperature);
        } else {
            failed = Some(ReadingKind::Temperature);
        }

        if let Some(pressure_calib) = &calib.pressure {
            let pressure = compensation::compensate_pressure(raw.pressure, pressure_calib, t_fine);
            if pressure > PRESSURE_MIN_HPA {
                self.pressure = Some(pressure);
            } else {
                failed.get_or_insert(ReadingKind::Pressure);
            }
        }

        if let Some(humidity_calib) = &calib.humidity {
            let humidity = compensation::compensate_humidity(raw.humidity, humidity_calib, t_fine);
            if (0.0..=100.0).contains(&humidity) {
                self.humidity = Some(humidity);
            } else {
                failed.get_or_insert(ReadingKind::Humidity);
            }
        }

        match failed {
            None => Ok(()),
            Some(kind) => Err(Error::OutOfRange(kind)),
        }
    }
}
