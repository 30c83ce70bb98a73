//! TCA9548A multiplexer channel selector.
//!
//! The device exposes eight I2C sub-buses, exactly one active at a time.
//! Selecting a channel is a single write of `1 << channel` to the control
//! register; there is no read-back verification, so callers trust the write
//! unless the transport itself reports failure.

use log::debug;

use crate::bus::I2cBus;
use crate::error::{Error, Result};

/// Command byte the original board wiring programs the channel mask through.
pub const CONTROL_REGISTER: u8 = 0x04;

/// Highest selectable channel number.
pub const MAX_CHANNEL: u8 = 7;

/// Compute the single-byte control mask for a channel.
///
/// Fails with [`Error::InvalidChannel`] outside 0–7.
pub fn channel_mask(channel: u8) -> Result<u8> {
    if channel > MAX_CHANNEL {
        return Err(Error::InvalidChannel(channel));
    }
    Ok(1 << channel)
}

/// Handle on the multiplexer at a fixed bus address.
#[derive(Debug, Clone, Copy)]
pub struct Multiplexer {
    address: u8,
}

impl Multiplexer {
    pub fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Activate exactly `channel`, deactivating all others.
    ///
    /// Side effect: one bus write.
    pub fn select(&self, bus: &mut dyn I2cBus, channel: u8) -> Result<()> {
        let mask = channel_mask(channel)?;
        bus.write_byte(self.address, CONTROL_REGISTER, mask)?;
        debug!("multiplexer {:#04x}: switched to channel {channel}", self.address);
        Ok(())
    }
}
