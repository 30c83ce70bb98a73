//! Unified error types for the acquisition core.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! update-loop's error handling uniform. All variants are `Copy` so they can
//! be cheaply passed between sessions and the hub without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bus read or write failed. Recoverable: the current cycle is
    /// aborted and retried on the next update.
    Transport(TransportError),
    /// A multiplexer channel outside 0–7. Configuration error, fatal to
    /// that sensor's setup.
    InvalidChannel(u8),
    /// A compensated value failed its plausibility bound. The cycle is
    /// marked not-ok; previously published values are retained.
    OutOfRange(ReadingKind),
    /// Calibration was never successfully populated; compensation is
    /// blocked until a configure cycle succeeds.
    CalibrationUnavailable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::InvalidChannel(ch) => {
                write!(f, "invalid channel {ch}: must be between 0 and 7")
            }
            Self::OutOfRange(kind) => write!(f, "{kind} reading out of range"),
            Self::CalibrationUnavailable => write!(f, "calibration data not populated"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures of the underlying I2C transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// A register write to `addr` failed.
    WriteFailed { addr: u8, reg: u8 },
    /// A register read from `addr` failed.
    ReadFailed { addr: u8, reg: u8 },
    /// The forced-mode measuring bit never cleared within the configured
    /// poll budget.
    MeasurementTimeout { addr: u8 },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed { addr, reg } => {
                write!(f, "write to {addr:#04x} reg {reg:#04x} failed")
            }
            Self::ReadFailed { addr, reg } => {
                write!(f, "read from {addr:#04x} reg {reg:#04x} failed")
            }
            Self::MeasurementTimeout { addr } => {
                write!(f, "measurement at {addr:#04x} never completed")
            }
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Reading kinds
// ---------------------------------------------------------------------------

/// Which physical quantity a value or failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingKind {
    Temperature,
    Pressure,
    Humidity,
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => write!(f, "temperature"),
            Self::Pressure => write!(f, "pressure"),
            Self::Humidity => write!(f, "humidity"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
