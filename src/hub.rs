//! Sensor hub — owns every session plus the shared bus, multiplexer
//! selector, and channel arbiter, and produces the published reading map
//! each update pass.
//!
//! The arbiter bracket covers the *entire* cycle (configure → trigger →
//! poll → read → compensate), not just the channel switch: a concurrent
//! session on another channel must not move the multiplexer mid-read.
//! Sessions can equally be driven from worker threads via [`run_cycle`];
//! `update_all` is the simple sequential driver the binary uses.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};

use crate::arbiter::ChannelArbiter;
use crate::bus::{lock_bus, SharedBus};
use crate::config::SystemConfig;
use crate::error::Result;
use crate::mux::Multiplexer;
use crate::sensor::session::SensorSession;
use crate::sensor::SensorReading;

/// Run one session's full update cycle under the channel arbiter.
///
/// Acquire → (switch if first user) → program/trigger/read/compensate →
/// release. The bus lock is taken after the grant and dropped before the
/// release, so arbiter state is never held across another session's I/O.
pub fn run_cycle(
    bus: &SharedBus,
    mux: &Multiplexer,
    arbiter: &ChannelArbiter,
    session: &mut SensorSession,
) -> Result<()> {
    let grant = arbiter.acquire(session.channel())?;
    let result = (|| {
        let mut bus = lock_bus(bus);
        if grant.switch_required {
            mux.select(&mut *bus, grant.channel)?;
        }
        session.update(&mut *bus)
    })();
    arbiter.release(grant.channel);
    result
}

pub struct SensorHub {
    bus: SharedBus,
    mux: Multiplexer,
    arbiter: Arc<ChannelArbiter>,
    sessions: Vec<SensorSession>,
}

impl std::fmt::Debug for SensorHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorHub")
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl SensorHub {
    /// Build sessions for every configured sensor. Sensors with an invalid
    /// channel are rejected up front rather than failing on first acquire.
    pub fn new(bus: SharedBus, config: &SystemConfig) -> Result<Self> {
        let mut sessions = Vec::with_capacity(config.sensors.len());
        for sensor in &config.sensors {
            sensor.validate()?;
            sessions.push(SensorSession::new(sensor.clone(), config.measure_poll));
        }
        info!(
            "hub: {} sensor(s) behind multiplexer {:#04x}",
            sessions.len(),
            config.multiplexer_address
        );
        Ok(Self {
            bus,
            mux: Multiplexer::new(config.multiplexer_address),
            arbiter: Arc::new(ChannelArbiter::new(config.arbiter)),
            sessions,
        })
    }

    /// Update every session once and return the published map. Per-sensor
    /// failures are already folded into each session's not-ok status; one
    /// flaky sensor never aborts the pass.
    pub fn update_all(&mut self) -> BTreeMap<String, SensorReading> {
        for session in &mut self.sessions {
            match run_cycle(&self.bus, &self.mux, &self.arbiter, session) {
                Ok(()) => debug!("hub: {} updated", session.id()),
                Err(e) => debug!("hub: {} cycle failed: {e}", session.id()),
            }
        }
        self.readings()
    }

    /// Current published values without touching the bus.
    pub fn readings(&self) -> BTreeMap<String, SensorReading> {
        self.sessions
            .iter()
            .map(|s| (s.id(), s.reading()))
            .collect()
    }

    /// JSON snapshot of the published map (what the binary dumps to disk).
    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.readings())
    }

    /// The shared arbiter, for observability (takeover count) and for
    /// driving sessions from worker threads.
    pub fn arbiter(&self) -> &Arc<ChannelArbiter> {
        &self.arbiter
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
