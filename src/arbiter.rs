//! Channel arbiter — serialises multiplexer switches across concurrently
//! scheduled sensor updates.
//!
//! Sessions on the *currently active* channel proceed immediately and share
//! it (reference-counted). A session targeting a *different* channel polls
//! until the active channel's user count drains to zero, bounded by
//! [`ArbiterConfig`]. When the bound is exhausted the arbiter forcibly takes
//! the channel over — documented best-effort behaviour inherited from the
//! deployed protocol, surfaced through [`ChannelArbiter::takeover_count`]
//! and a warning log rather than happening silently.
//!
//! One arbiter instance is shared (via `Arc`) by every session on the bus;
//! the lock state is the only cross-session mutable data in the crate apart
//! from the bus itself.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::config::ArbiterConfig;
use crate::error::Result;
use crate::mux::channel_mask;

// ───────────────────────────────────────────────────────────────
// Lock state
// ───────────────────────────────────────────────────────────────

/// Process-wide channel lock state.
///
/// Invariant: at most one channel is active; `users` counts the sessions
/// currently permitted on it; switching to a different channel requires
/// `users == 0` (modulo the bounded-wait takeover escape).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChannelLockState {
    active: Option<u8>,
    users: u32,
}

/// What [`ChannelArbiter::acquire`] granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub channel: u8,
    /// `true` when this grant activated the channel, so the caller must
    /// switch the multiplexer before any sensor traffic. `false` means the
    /// channel was already active and no switch write is needed.
    pub switch_required: bool,
}

// ───────────────────────────────────────────────────────────────
// Arbiter
// ───────────────────────────────────────────────────────────────

pub struct ChannelArbiter {
    state: Mutex<ChannelLockState>,
    config: ArbiterConfig,
    /// Count of bounded-wait exhaustions that ended in a forced takeover.
    takeovers: AtomicU32,
}

impl ChannelArbiter {
    pub fn new(config: ArbiterConfig) -> Self {
        Self {
            state: Mutex::new(ChannelLockState {
                active: None,
                users: 0,
            }),
            config,
            takeovers: AtomicU32::new(0),
        }
    }

    /// Acquire the right to use `channel` for one full update cycle.
    ///
    /// Returns immediately when the channel is free or already active;
    /// otherwise polls until the active channel drains, up to
    /// `max_wait_polls` attempts with `poll_interval_ms` between them, and
    /// then takes the channel over anyway.
    pub fn acquire(&self, channel: u8) -> Result<Grant> {
        channel_mask(channel)?;

        let mut polls = 0u32;
        loop {
            let mut state = self.lock_state();
            match state.active {
                None => {
                    state.active = Some(channel);
                    state.users = 1;
                    debug!("arbiter: channel {channel} activated");
                    return Ok(Grant {
                        channel,
                        switch_required: true,
                    });
                }
                Some(active) if active == channel => {
                    state.users += 1;
                    debug!("arbiter: channel {channel} shared, {} users", state.users);
                    return Ok(Grant {
                        channel,
                        switch_required: false,
                    });
                }
                Some(active) => {
                    if polls >= self.config.max_wait_polls {
                        // Best-effort escape: the old holders keep running,
                        // but the channel marker moves on. Their release()
                        // calls become no-ops against the new channel.
                        let total = self.takeovers.fetch_add(1, Ordering::Relaxed) + 1;
                        warn!(
                            "arbiter: channel {active} never drained ({} users); \
                             forcing takeover for channel {channel} (takeover #{total})",
                            state.users
                        );
                        state.active = Some(channel);
                        state.users = 1;
                        return Ok(Grant {
                            channel,
                            switch_required: true,
                        });
                    }
                    drop(state);
                    polls += 1;
                    thread::sleep(Duration::from_millis(self.config.poll_interval_ms));
                }
            }
        }
    }

    /// Release one user of `channel`. When the count drains to zero the
    /// active-channel marker is cleared so a different channel may proceed.
    ///
    /// A release against a channel that is no longer active (the takeover
    /// case) is a deliberate no-op: it must not corrupt the new holder's
    /// count.
    pub fn release(&self, channel: u8) {
        let mut state = self.lock_state();
        if state.active != Some(channel) {
            debug!("arbiter: stale release for channel {channel} ignored");
            return;
        }
        state.users = state.users.saturating_sub(1);
        if state.users == 0 {
            state.active = None;
            debug!("arbiter: channel {channel} drained");
        }
    }

    /// Currently active channel, if any.
    pub fn active_channel(&self) -> Option<u8> {
        self.lock_state().active
    }

    /// Number of sessions currently holding the active channel.
    pub fn active_users(&self) -> u32 {
        self.lock_state().users
    }

    /// Total forced takeovers since startup.
    pub fn takeover_count(&self) -> u32 {
        self.takeovers.load(Ordering::Relaxed)
    }

    fn lock_state(&self) -> MutexGuard<'_, ChannelLockState> {
        // The state is two plain fields; recover from a poisoned lock
        // rather than wedging every sensor on the bus.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
