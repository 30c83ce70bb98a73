//! Multi-BME280 environmental acquisition behind a TCA9548A I2C multiplexer.
//!
//! The sensors all answer on one of two fixed addresses, so several of them
//! can only share a bus through the multiplexer's channel isolation. This
//! crate owns the two hard pieces of that arrangement: the bit-exact
//! calibration/compensation pipeline (raw ADC registers → °C / hPa / %RH)
//! and the channel-arbitration protocol that serialises concurrent sensor
//! updates over the single shared bus.
//!
//! The raw I2C transport is a port trait ([`bus::I2cBus`]); adapters exist
//! for `embedded-hal` implementors and, behind the `linux` feature, the
//! Raspberry Pi bus.

#![deny(unused_must_use)]

pub mod arbiter;
pub mod bus;
pub mod config;
pub mod hub;
pub mod mux;
pub mod sensor;

mod error;

pub use error::{Error, ReadingKind, Result, TransportError};
