//! BME280 calibration coefficients: register layout and parsing.
//!
//! The sensor stores 32 calibration bytes across three regions (24 at 0x88,
//! one at 0xA1, seven at 0xE1). Parsing is separated from I/O so the
//! bit-layout rules are testable against fixed byte vectors.

use crate::bus::I2cBus;
use crate::config::SensorConfig;
use crate::error::Result;
use crate::sensor::registers;

/// Total raw calibration bytes read from the sensor.
pub const CALIB_LEN: usize =
    registers::CALIB_BLOCK_TP_LEN + 1 + registers::CALIB_BLOCK_H_LEN;

/// Immutable coefficient sets, populated once per sensor and then read-only.
///
/// Pressure and humidity sets are present iff the corresponding oversampling
/// is non-zero; compensation for a disabled channel is structurally
/// impossible rather than probed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationData {
    /// dig_T1 — the only unsigned 16-bit temperature coefficient.
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub pressure: Option<PressureCalibration>,
    pub humidity: Option<HumidityCalibration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureCalibration {
    /// dig_P1 — unsigned; a zero here is the documented divide-by-zero
    /// guard case in pressure compensation.
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumidityCalibration {
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    /// 12-bit value: full byte 0xE4 concatenated with the low nibble of 0xE5.
    pub h4: u16,
    /// 12-bit value: full byte 0xE6 concatenated with the high nibble of 0xE5.
    pub h5: u16,
    pub h6: i8,
}

fn read_u16_le(raw: &[u8], index: usize) -> u16 {
    u16::from(raw[index]) | (u16::from(raw[index + 1]) << 8)
}

fn read_i16_le(raw: &[u8], index: usize) -> i16 {
    read_u16_le(raw, index) as i16
}

impl CalibrationData {
    /// Parse the 32-byte calibration image.
    ///
    /// Byte order within each 16-bit slot is little-endian; every slot
    /// except `t1` and `p1` is two's-complement signed.
    pub fn parse(raw: &[u8; CALIB_LEN], with_pressure: bool, with_humidity: bool) -> Self {
        let pressure = with_pressure.then(|| PressureCalibration {
            p1: read_u16_le(raw, 6),
            p2: read_i16_le(raw, 8),
            p3: read_i16_le(raw, 10),
            p4: read_i16_le(raw, 12),
            p5: read_i16_le(raw, 14),
            p6: read_i16_le(raw, 16),
            p7: read_i16_le(raw, 18),
            p8: read_i16_le(raw, 20),
            p9: read_i16_le(raw, 22),
        });

        let humidity = with_humidity.then(|| HumidityCalibration {
            h1: raw[24],
            h2: read_i16_le(raw, 25),
            h3: raw[27],
            h4: (u16::from(raw[28]) << 4) | u16::from(raw[29] & 0x0F),
            h5: (u16::from(raw[30]) << 4) | u16::from(raw[29] >> 4),
            h6: raw[31] as i8,
        });

        Self {
            t1: read_u16_le(raw, 0),
            t2: read_i16_le(raw, 2),
            t3: read_i16_le(raw, 4),
            pressure,
            humidity,
        }
    }

    /// Read the three calibration regions from the sensor and parse them.
    ///
    /// Any transport failure leaves the caller without calibration; the
    /// session must report not-ok rather than compensate against partial
    /// data.
    pub fn populate(bus: &mut dyn I2cBus, config: &SensorConfig) -> Result<Self> {
        let addr = config.address;
        let mut raw = [0u8; CALIB_LEN];

        bus.read_block(
            addr,
            registers::CALIB_BLOCK_TP,
            &mut raw[..registers::CALIB_BLOCK_TP_LEN],
        )?;
        raw[registers::CALIB_BLOCK_TP_LEN] = bus.read_byte(addr, registers::CALIB_H1)?;
        bus.read_block(
            addr,
            registers::CALIB_BLOCK_H,
            &mut raw[registers::CALIB_BLOCK_TP_LEN + 1..],
        )?;

        Ok(Self::parse(
            &raw,
            config.with_pressure(),
            config.with_humidity(),
        ))
    }
}
