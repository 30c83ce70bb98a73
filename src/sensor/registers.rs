//! BME280 register map and control-byte packing.
//!
//! Addresses and bit layouts are fixed by the hardware (Bosch datasheet
//! BST-BME280-DS001-10).

/// First calibration block: 0x88..=0x9F (T and P coefficients).
pub const CALIB_BLOCK_TP: u8 = 0x88;
pub const CALIB_BLOCK_TP_LEN: usize = 24;

/// Single humidity coefficient byte (H1).
pub const CALIB_H1: u8 = 0xA1;

/// Second humidity block: 0xE1..=0xE7 (H2..H6).
pub const CALIB_BLOCK_H: u8 = 0xE1;
pub const CALIB_BLOCK_H_LEN: usize = 7;

/// Humidity oversampling control.
pub const CTRL_HUM: u8 = 0xF2;
/// Status register; bit 3 set while a conversion is running.
pub const STATUS: u8 = 0xF3;
/// Temperature/pressure oversampling and operating mode.
pub const CTRL_MEAS: u8 = 0xF4;
/// Standby time, IIR filter, 3-wire SPI flag.
pub const CONFIG: u8 = 0xF5;
/// Start of the 8-byte burst data block (P msb..xlsb, T msb..xlsb, H msb/lsb).
pub const DATA: u8 = 0xF7;
pub const DATA_LEN: usize = 8;

/// Conversion-in-progress bit within [`STATUS`].
pub const STATUS_MEASURING: u8 = 0x08;

/// Pack the ctrl_meas register image.
pub fn ctrl_meas(osrs_t: u8, osrs_p: u8, mode: u8) -> u8 {
    (osrs_t << 5) | ((osrs_p & 0x07) << 2) | (mode & 0x03)
}

/// Pack the config register image.
pub fn config(t_standby: u8, filter: u8, spi3w_en: bool) -> u8 {
    (t_standby << 5) | ((filter & 0x07) << 2) | u8::from(spi3w_en)
}

/// Pack the ctrl_hum register image (low three bits only).
pub fn ctrl_hum(osrs_h: u8) -> u8 {
    osrs_h & 0x07
}
