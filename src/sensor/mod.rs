//! BME280 sensor subsystem — calibration, compensation, and the per-sensor
//! update session.

pub mod calibration;
pub mod compensation;
pub mod registers;
pub mod session;

use serde::Serialize;

/// The three raw ADC readings assembled from the 8-byte burst at 0xF7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// 20-bit pressure ADC value.
    pub pressure: u32,
    /// 20-bit temperature ADC value.
    pub temperature: u32,
    /// 16-bit humidity ADC value.
    pub humidity: u16,
}

impl RawSample {
    /// Unpack the burst block: msb/lsb/xlsb-nibble for pressure and
    /// temperature, two full bytes for humidity.
    pub fn from_block(block: &[u8; registers::DATA_LEN]) -> Self {
        Self {
            pressure: (u32::from(block[0]) << 12)
                | (u32::from(block[1]) << 4)
                | (u32::from(block[2]) >> 4),
            temperature: (u32::from(block[3]) << 12)
                | (u32::from(block[4]) << 4)
                | (u32::from(block[5]) >> 4),
            humidity: (u16::from(block[6]) << 8) | u16::from(block[7]),
        }
    }
}

/// Published reading for one sensor: each field is a value or an explicit
/// unavailable marker (`None` = channel disabled, or no successful cycle
/// yet). On a faulted cycle previously published values are retained and
/// `ok` goes false.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorReading {
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    /// Whether the most recent update cycle passed every plausibility bound.
    pub ok: bool,
}

impl SensorReading {
    /// Dew point in °C, derivable when both temperature and humidity are
    /// published. Constants from the HTU21D application note.
    pub fn dew_point(&self) -> Option<f64> {
        let (t, h) = (self.temperature?, self.humidity?);
        if h <= 0.0 {
            return None;
        }
        const COEF_A: f64 = 8.1332;
        const COEF_B: f64 = 1762.39;
        const COEF_C: f64 = 235.66;
        let partial_pressure = 10f64.powf(COEF_A - COEF_B / (t + COEF_C));
        Some(-COEF_C - COEF_B / ((h * partial_pressure / 100.0).log10() - COEF_A))
    }
}
