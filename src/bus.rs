//! I2C transport port — the hexagonal boundary between the acquisition core
//! and the physical bus.
//!
//! ```text
//!   Adapter ──▶ I2cBus trait ──▶ Multiplexer / SensorSession (domain)
//! ```
//!
//! The domain never touches a HAL directly: everything goes through
//! [`I2cBus`], which mirrors the SMBus register primitives the sensor and
//! multiplexer protocols are written against. Adapters for `embedded-hal`
//! implementors and (behind the `linux` feature) the Raspberry Pi `rppal`
//! bus live at the bottom of this module; tests inject an in-memory fake.

use std::sync::{Arc, Mutex};

use crate::error::TransportError;

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

/// Byte-level register access to a shared I2C bus.
///
/// Any call may fail with a [`TransportError`]; the core treats that as
/// fatal to the current update cycle, never fatal to the process.
pub trait I2cBus: Send {
    /// Write one byte to a device register.
    fn write_byte(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), TransportError>;

    /// Read one byte from a device register.
    fn read_byte(&mut self, addr: u8, reg: u8) -> Result<u8, TransportError>;

    /// Read `buf.len()` consecutive bytes starting at a device register.
    fn read_block(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), TransportError>;
}

/// The bus is the sole shared hardware resource: every session on every
/// channel funnels through one of these.
pub type SharedBus = Arc<Mutex<dyn I2cBus>>;

/// Lock a [`SharedBus`], recovering the guard if a previous holder panicked.
/// Register state on the wire is write-through, so a poisoned lock carries
/// no torn data.
pub fn lock_bus(bus: &SharedBus) -> std::sync::MutexGuard<'_, dyn I2cBus + 'static> {
    bus.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// embedded-hal adapter
// ───────────────────────────────────────────────────────────────

/// Adapter that exposes any blocking `embedded-hal` I2C implementation as an
/// [`I2cBus`]. HAL error details are collapsed into [`TransportError`]; the
/// core only needs to know which cycle to abort.
pub struct HalBus<T> {
    inner: T,
}

impl<T> HalBus<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T> I2cBus for HalBus<T>
where
    T: embedded_hal::i2c::I2c + Send,
{
    fn write_byte(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), TransportError> {
        self.inner
            .write(addr, &[reg, value])
            .map_err(|_| TransportError::WriteFailed { addr, reg })
    }

    fn read_byte(&mut self, addr: u8, reg: u8) -> Result<u8, TransportError> {
        let mut buf = [0u8; 1];
        self.inner
            .write_read(addr, &[reg], &mut buf)
            .map_err(|_| TransportError::ReadFailed { addr, reg })?;
        Ok(buf[0])
    }

    fn read_block(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), TransportError> {
        self.inner
            .write_read(addr, &[reg], buf)
            .map_err(|_| TransportError::ReadFailed { addr, reg })
    }
}

// ───────────────────────────────────────────────────────────────
// Raspberry Pi adapter (linux feature)
// ───────────────────────────────────────────────────────────────

#[cfg(feature = "linux")]
pub use linux::LinuxBus;

#[cfg(feature = "linux")]
mod linux {
    use super::I2cBus;
    use crate::error::TransportError;

    /// SMBus transport on the Raspberry Pi's primary I2C bus.
    pub struct LinuxBus {
        i2c: rppal::i2c::I2c,
    }

    impl LinuxBus {
        /// Open the default I2C bus (`/dev/i2c-1` on most Pi models).
        pub fn new() -> anyhow::Result<Self> {
            let i2c = rppal::i2c::I2c::new()?;
            Ok(Self { i2c })
        }

        /// Open a specific bus number (matches the `i2c_bus` config key).
        pub fn with_bus(bus: u8) -> anyhow::Result<Self> {
            let i2c = rppal::i2c::I2c::with_bus(bus)?;
            Ok(Self { i2c })
        }

        fn select(&mut self, addr: u8, reg: u8) -> Result<(), TransportError> {
            self.i2c
                .set_slave_address(u16::from(addr))
                .map_err(|_| TransportError::WriteFailed { addr, reg })
        }
    }

    impl I2cBus for LinuxBus {
        fn write_byte(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), TransportError> {
            self.select(addr, reg)?;
            self.i2c
                .smbus_write_byte(reg, value)
                .map_err(|_| TransportError::WriteFailed { addr, reg })
        }

        fn read_byte(&mut self, addr: u8, reg: u8) -> Result<u8, TransportError> {
            self.select(addr, reg)?;
            self.i2c
                .smbus_read_byte(reg)
                .map_err(|_| TransportError::ReadFailed { addr, reg })
        }

        fn read_block(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), TransportError> {
            self.select(addr, reg)?;
            self.i2c
                .block_read(reg, buf)
                .map_err(|_| TransportError::ReadFailed { addr, reg })
        }
    }
}
