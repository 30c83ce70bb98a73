//! Compensation engine — raw ADC values to physical units.
//!
//! Implements the Bosch datasheet's **double-precision floating point**
//! compensation formulas (BST-BME280-DS001-10 §8.1). The integer fixed-point
//! variant has different rounding and is deliberately not used anywhere in
//! this crate; tests pin the float behaviour.
//!
//! All three conversions are pure. Pressure and humidity consume the
//! temperature-fine intermediate, so temperature must be compensated first
//! and `t_fine` threaded through explicitly — there is no hidden state.

use crate::sensor::calibration::{CalibrationData, HumidityCalibration, PressureCalibration};

/// Compensate a raw 20-bit temperature reading.
///
/// Returns `(celsius, t_fine)`. `t_fine` is the undivided sum of both
/// polynomial terms, retained at full precision for the pressure and
/// humidity conversions.
///
/// A non-zero `delta_temp` (self-heating correction) shifts the result and
/// rescales `t_fine` so the other conversions see the corrected value.
pub fn compensate_temperature(raw: u32, calib: &CalibrationData, delta_temp: f64) -> (f64, f64) {
    let adc_t = f64::from(raw);
    let t1 = f64::from(calib.t1);

    let var1 = (adc_t / 16384.0 - t1 / 1024.0) * f64::from(calib.t2);
    let var2 = (adc_t / 131072.0 - t1 / 8192.0)
        * (adc_t / 131072.0 - t1 / 8192.0)
        * f64::from(calib.t3);

    let mut t_fine = var1 + var2;
    let celsius = if delta_temp != 0.0 {
        let corrected = t_fine / 5120.0 + delta_temp;
        t_fine = corrected * 5120.0;
        corrected
    } else {
        t_fine / 5120.0
    };
    (celsius, t_fine)
}

/// Compensate a raw 20-bit pressure reading into hPa.
///
/// Returns 0.0 when the first-coefficient term is zero — the datasheet's
/// divide-by-zero guard, a documented design decision rather than an error.
pub fn compensate_pressure(raw: u32, calib: &PressureCalibration, t_fine: f64) -> f64 {
    let var1 = t_fine / 2.0 - 64000.0;
    let mut var2 = (var1 / 4.0) * (var1 / 4.0) / 2048.0;
    var2 *= f64::from(calib.p6);
    var2 += var1 * f64::from(calib.p5) * 2.0;
    var2 = var2 / 4.0 + f64::from(calib.p4) * 65536.0;

    let mut var1 = (f64::from(calib.p3) * ((var1 / 4.0) * (var1 / 4.0) / 8192.0)) / 8.0
        + (f64::from(calib.p2) * var1) / 2.0;
    var1 /= 262144.0;
    var1 = (32768.0 + var1) * f64::from(calib.p1) / 32768.0;

    if var1 == 0.0 {
        return 0.0;
    }

    let mut pressure = (1_048_576.0 - f64::from(raw) - var2 / 4096.0) * 3125.0;
    if pressure < 2_147_483_648.0 {
        pressure = pressure * 2.0 / var1;
    } else {
        pressure = pressure / var1 * 2.0;
    }

    let var1 = f64::from(calib.p9) * ((pressure / 8.0) * (pressure / 8.0) / 8192.0) / 4096.0;
    let var2 = pressure / 4.0 * f64::from(calib.p8) / 8192.0;
    pressure += (var1 + var2 + f64::from(calib.p7)) / 16.0;

    pressure / 100.0
}

/// Compensate a raw 16-bit humidity reading into %RH, clamped to [0, 100].
///
/// The polynomial can mathematically overshoot both bounds; clamping is the
/// final step. A `t_fine` exactly at the 76800 pivot returns 0.0 (the
/// formula would otherwise divide by zero).
pub fn compensate_humidity(raw: u16, calib: &HumidityCalibration, t_fine: f64) -> f64 {
    let var_h = t_fine - 76800.0;
    if var_h == 0.0 {
        return 0.0;
    }

    let adc_h = f64::from(raw);
    let mut humidity = (adc_h
        - (f64::from(calib.h4) * 64.0 + f64::from(calib.h5) / 16384.0 * var_h))
        * (f64::from(calib.h2) / 65536.0
            * (1.0
                + f64::from(calib.h6) / 67108864.0
                    * var_h
                    * (1.0 + f64::from(calib.h3) / 67108864.0 * var_h)));
    humidity *= 1.0 - f64::from(calib.h1) * humidity / 524288.0;

    humidity.clamp(0.0, 100.0)
}
