//! In-memory I2C bus for integration tests.
//!
//! Models the multiplexer plus any number of BME280s behind it: devices are
//! keyed by (channel, address) and only reachable while their channel is
//! active, so tests catch traffic issued before the switch write. Records
//! every write and supports failure injection per register.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use envmux::bus::I2cBus;
use envmux::sensor::registers;
use envmux::TransportError;

/// Calibration image of the reference unit used across the suite
/// (datasheet example T/P coefficients plus a representative humidity set).
pub const REFERENCE_CALIB: [u8; 32] = [
    112, 107, 67, 103, 24, 252, 125, 142, 67, 214, 208, 11, 39, 11, 140, 0, 249, 255, 140, 60,
    248, 198, 112, 23, 75, 99, 1, 0, 21, 3, 0, 30,
];

/// Burst data block producing raw T=0x7E4C0, P=0x534F0, H=0x6A3C.
pub const REFERENCE_DATA: [u8; 8] = [0x53, 0x4F, 0x00, 0x7E, 0x4C, 0x00, 0x6A, 0x3C];

/// Golden compensated triplet for the reference calibration + data
/// (double-precision float formulas).
pub const GOLDEN_TEMPERATURE: f64 = 24.275303645059466;
pub const GOLDEN_PRESSURE: f64 = 1132.993307354018;
pub const GOLDEN_HUMIDITY: f64 = 30.292849112715587;

pub struct FakeSensor {
    pub calib: [u8; 32],
    pub data: [u8; 8],
    /// Status reads that report "measuring" after each forced trigger.
    pub measuring_polls: u32,
    status_countdown: u32,
    /// Register write history: (reg, value).
    pub writes: Vec<(u8, u8)>,
    pub status_reads: u32,
}

impl FakeSensor {
    pub fn new() -> Self {
        Self {
            calib: REFERENCE_CALIB,
            data: REFERENCE_DATA,
            measuring_polls: 0,
            status_countdown: 0,
            writes: Vec::new(),
            status_reads: 0,
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        self.writes.push((reg, value));
        // A forced-mode trigger restarts the conversion window.
        if reg == registers::CTRL_MEAS && value & 0x03 == 0x02 {
            self.status_countdown = self.measuring_polls;
        }
    }

    fn read(&mut self, reg: u8) -> Option<u8> {
        match reg {
            registers::STATUS => {
                self.status_reads += 1;
                if self.status_countdown > 0 {
                    self.status_countdown -= 1;
                    Some(registers::STATUS_MEASURING)
                } else {
                    Some(0)
                }
            }
            registers::CALIB_H1 => Some(self.calib[24]),
            _ => None,
        }
    }

    fn read_block(&self, reg: u8, buf: &mut [u8]) -> bool {
        let src: &[u8] = match reg {
            registers::CALIB_BLOCK_TP => &self.calib[..24],
            registers::CALIB_BLOCK_H => &self.calib[25..32],
            registers::DATA => &self.data,
            _ => return false,
        };
        if buf.len() > src.len() {
            return false;
        }
        buf.copy_from_slice(&src[..buf.len()]);
        true
    }
}

struct BusState {
    mux_address: u8,
    active_channel: Option<u8>,
    mux_writes: Vec<u8>,
    devices: HashMap<(u8, u8), FakeSensor>,
    /// Registers at which block reads fail (transport fault injection).
    failing_block_regs: HashSet<u8>,
}

/// Cloneable handle onto shared bus state; one clone goes behind the
/// `SharedBus` mutex, the test keeps another for inspection.
#[derive(Clone)]
pub struct FakeBus {
    state: Arc<Mutex<BusState>>,
}

impl FakeBus {
    pub fn new(mux_address: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState {
                mux_address,
                active_channel: None,
                mux_writes: Vec::new(),
                devices: HashMap::new(),
                failing_block_regs: HashSet::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_sensor(&self, channel: u8, address: u8, sensor: FakeSensor) {
        self.lock().devices.insert((channel, address), sensor);
    }

    pub fn active_channel(&self) -> Option<u8> {
        self.lock().active_channel
    }

    pub fn mux_writes(&self) -> Vec<u8> {
        self.lock().mux_writes.clone()
    }

    pub fn fail_block_reads_at(&self, reg: u8) {
        self.lock().failing_block_regs.insert(reg);
    }

    pub fn clear_failures(&self) {
        self.lock().failing_block_regs.clear();
    }

    /// Inspect a device with `f` (panics if the device does not exist —
    /// test wiring error, not a runtime condition).
    pub fn with_sensor<R>(&self, channel: u8, address: u8, f: impl FnOnce(&FakeSensor) -> R) -> R {
        let state = self.lock();
        f(state
            .devices
            .get(&(channel, address))
            .expect("no such fake sensor"))
    }

    pub fn set_data(&self, channel: u8, address: u8, data: [u8; 8]) {
        if let Some(s) = self.lock().devices.get_mut(&(channel, address)) {
            s.data = data;
        }
    }

    pub fn set_calib(&self, channel: u8, address: u8, calib: [u8; 32]) {
        if let Some(s) = self.lock().devices.get_mut(&(channel, address)) {
            s.calib = calib;
        }
    }

    pub fn set_measuring_polls(&self, channel: u8, address: u8, polls: u32) {
        if let Some(s) = self.lock().devices.get_mut(&(channel, address)) {
            s.measuring_polls = polls;
        }
    }
}

impl I2cBus for FakeBus {
    fn write_byte(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), TransportError> {
        let mut state = self.lock();
        if addr == state.mux_address {
            assert_eq!(reg, envmux::mux::CONTROL_REGISTER, "unexpected mux register");
            assert_eq!(value.count_ones(), 1, "mux mask must select one channel");
            state.active_channel = Some(value.trailing_zeros() as u8);
            state.mux_writes.push(value);
            return Ok(());
        }
        let channel = state
            .active_channel
            .ok_or(TransportError::WriteFailed { addr, reg })?;
        match state.devices.get_mut(&(channel, addr)) {
            Some(sensor) => {
                sensor.write(reg, value);
                Ok(())
            }
            None => Err(TransportError::WriteFailed { addr, reg }),
        }
    }

    fn read_byte(&mut self, addr: u8, reg: u8) -> Result<u8, TransportError> {
        let mut state = self.lock();
        let channel = state
            .active_channel
            .ok_or(TransportError::ReadFailed { addr, reg })?;
        state
            .devices
            .get_mut(&(channel, addr))
            .and_then(|sensor| sensor.read(reg))
            .ok_or(TransportError::ReadFailed { addr, reg })
    }

    fn read_block(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), TransportError> {
        let state = self.lock();
        if state.failing_block_regs.contains(&reg) {
            return Err(TransportError::ReadFailed { addr, reg });
        }
        let channel = state
            .active_channel
            .ok_or(TransportError::ReadFailed { addr, reg })?;
        let ok = state
            .devices
            .get(&(channel, addr))
            .is_some_and(|sensor| sensor.read_block(reg, buf));
        if ok {
            Ok(())
        } else {
            Err(TransportError::ReadFailed { addr, reg })
        }
    }
}
