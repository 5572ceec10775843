//! Shared control state — the single data model both concurrent actors see.
//!
//! One [`ControlState`] value lives behind one `Mutex` for the whole process:
//! the cyclic coordinator mutates it when ingesting status and evaluating the
//! business rules, the control-surface adapter mutates it on operator
//! requests.  Every critical section is O(door count) and performs no I/O,
//! so lock hold time stays negligible against the cycle period.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::error::FrameError;

/// Hard upper bound on doors per consist; the configured count is `1..=N`.
pub const MAX_DOORS: usize = 8;

/// Every wire entry (status or command) occupies exactly this many bytes.
pub const ENTRY_SIZE: usize = 8;

/// Fixed-capacity door array, sized for the largest supported consist.
pub type DoorVec<T> = heapless::Vec<T, MAX_DOORS>;

// ───────────────────────────────────────────────────────────────
// Wire enums
// ───────────────────────────────────────────────────────────────

/// Physical door state as reported by the gateway.  Wire codes: OPEN=0,
/// CLOSED=1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum DoorState {
    Open = 0,
    Closed = 1,
}

impl DoorState {
    pub const fn to_wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(b: u8) -> Result<Self, FrameError> {
        match b {
            0 => Ok(Self::Open),
            1 => Ok(Self::Closed),
            other => Err(FrameError::UnknownState(other)),
        }
    }
}

/// Door command as carried in both directions.  Wire codes: NONE=0, OPEN=1,
/// CLOSE=2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[repr(u8)]
pub enum DoorCommand {
    #[default]
    None = 0,
    Open = 1,
    Close = 2,
}

impl DoorCommand {
    pub const fn to_wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(b: u8) -> Result<Self, FrameError> {
        match b {
            0 => Ok(Self::None),
            1 => Ok(Self::Open),
            2 => Ok(Self::Close),
            other => Err(FrameError::UnknownCommand(other)),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Aggregated frame entries
// ───────────────────────────────────────────────────────────────

/// One door's telemetry within an aggregated status frame.
///
/// `status_counter` is free-running and owned by the gateway; this core
/// never validates it for monotonicity, it is carried for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DoorStatusEntry {
    pub state: DoorState,
    pub obstruction: bool,
    pub last_cmd: DoorCommand,
    pub close_blocked: bool,
    pub status_counter: u8,
}

impl DoorStatusEntry {
    /// Fail-safe default before the first status frame arrives: assume the
    /// door is closed and unobstructed.
    pub const fn closed() -> Self {
        Self {
            state: DoorState::Closed,
            obstruction: false,
            last_cmd: DoorCommand::None,
            close_blocked: false,
            status_counter: 0,
        }
    }
}

/// One door's command within an aggregated command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DoorCommandEntry {
    pub cmd: DoorCommand,
    /// Increments by exactly 1 (mod 256) on every resolved-command
    /// transition, never on repeats.  The actuator uses it to tell a new
    /// command from a re-sent one.
    pub alive_counter: u8,
}

// ───────────────────────────────────────────────────────────────
// Control state
// ───────────────────────────────────────────────────────────────

/// The shared control state.  Created once at startup, torn down at process
/// shutdown, never persisted.
#[derive(Debug, Clone)]
pub struct ControlState {
    /// Latest ingested aggregated status, index = door identity.
    pub status: DoorVec<DoorStatusEntry>,
    /// Authoritative aggregated command, re-evaluated every cycle.
    pub command: DoorVec<DoorCommandEntry>,
    /// Train speed in km/h.
    pub speed: u32,
    /// Emergency override active.
    pub emergency: bool,
    /// Resolved command recorded at the end of the previous rule pass,
    /// used solely to detect transitions.  Not transmitted.
    pub(crate) prev_resolved: DoorVec<DoorCommand>,
}

impl ControlState {
    /// Zero-initialised state for `door_count` doors, door state defaulted
    /// to CLOSED.
    ///
    /// Panics if `door_count` is outside `1..=MAX_DOORS`.  The config layer
    /// rejects such counts before any state is built, so tripping this is a
    /// construction bug, not an input error.
    pub fn new(door_count: usize) -> Self {
        assert!(
            (1..=MAX_DOORS).contains(&door_count),
            "door_count {door_count} outside 1..={MAX_DOORS}"
        );
        let mut status = DoorVec::new();
        let mut command = DoorVec::new();
        let mut prev_resolved = DoorVec::new();
        for _ in 0..door_count {
            // Capacity is MAX_DOORS, count is validated, pushes cannot fail.
            let _ = status.push(DoorStatusEntry::closed());
            let _ = command.push(DoorCommandEntry::default());
            let _ = prev_resolved.push(DoorCommand::None);
        }
        Self {
            status,
            command,
            speed: 0,
            emergency: false,
            prev_resolved,
        }
    }

    /// Number of configured doors.
    pub fn door_count(&self) -> usize {
        self.status.len()
    }

    /// Read-only copy for external rendering.
    pub fn snapshot(&self) -> ControlSnapshot {
        let mut doors = DoorVec::new();
        for (i, (s, c)) in self.status.iter().zip(self.command.iter()).enumerate() {
            let _ = doors.push(DoorSnapshot {
                id: i,
                state: s.state,
                obstruction: s.obstruction,
                last_cmd: s.last_cmd,
                close_blocked: s.close_blocked,
                status_counter: s.status_counter,
                cmd: c.cmd,
                alive_counter: c.alive_counter,
            });
        }
        ControlSnapshot {
            speed: self.speed,
            emergency: self.emergency,
            doors,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Snapshot (read model)
// ───────────────────────────────────────────────────────────────

/// One door's merged status + command view.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DoorSnapshot {
    pub id: usize,
    pub state: DoorState,
    pub obstruction: bool,
    pub last_cmd: DoorCommand,
    pub close_blocked: bool,
    pub status_counter: u8,
    pub cmd: DoorCommand,
    pub alive_counter: u8,
}

/// Read-only copy of the whole control state, for console/JSON rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ControlSnapshot {
    pub speed: u32,
    pub emergency: bool,
    pub doors: DoorVec<DoorSnapshot>,
}

// ───────────────────────────────────────────────────────────────
// Shared ownership
// ───────────────────────────────────────────────────────────────

/// The one shared handle both the coordinator and the adapter hold.
pub type SharedState = Arc<Mutex<ControlState>>;

/// Wrap a fresh state for sharing.
pub fn shared(state: ControlState) -> SharedState {
    Arc::new(Mutex::new(state))
}

/// Lock the shared state, recovering from poisoning.
///
/// A panic on the other side cannot leave the state semantically stale: the
/// next rule pass rewrites every command, so recovering the guard is safe
/// and keeps the control loop alive.
pub fn lock(state: &SharedState) -> MutexGuard<'_, ControlState> {
    state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
