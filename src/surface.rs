//! Control-surface adapter — the bounded operation set exposed to the
//! operator surface (console, HTTP, anything line- or request-based).
//!
//! Every operation takes the same lock as the coordinator, completes in
//! O(door count) with no I/O, and either mutates the state or returns a
//! typed [`RequestError`] with the state untouched.  Admission checks live
//! here, not in the rule engine, so illegal intents never enter the state.

use log::info;

use crate::error::RequestError;
use crate::state::{ControlSnapshot, DoorCommand, SharedState, lock};

/// What an operator may ask a door to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorIntent {
    Open,
    Close,
}

impl DoorIntent {
    fn command(self) -> DoorCommand {
        match self {
            Self::Open => DoorCommand::Open,
            Self::Close => DoorCommand::Close,
        }
    }
}

/// Handle cloned into every operator-surface worker.
#[derive(Clone)]
pub struct ControlSurface {
    state: SharedState,
}

impl ControlSurface {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Unconditional speed overwrite (km/h).
    pub fn set_speed(&self, kmh: u32) {
        let mut s = lock(&self.state);
        s.speed = kmh;
        info!("surface: speed set to {kmh} km/h");
    }

    /// Unconditional emergency overwrite.
    ///
    /// On the transition to active, all door commands are forced OPEN
    /// immediately rather than waiting for the next cycle's rule pass.  The
    /// previous-resolved snapshot is left alone, so the next pass accounts
    /// each transition in the alive counters exactly once.
    pub fn set_emergency(&self, active: bool) {
        let mut s = lock(&self.state);
        s.emergency = active;
        if active {
            for c in s.command.iter_mut() {
                c.cmd = DoorCommand::Open;
            }
            info!("surface: EMERGENCY ACTIVATED, all doors commanded open");
        } else {
            info!("surface: emergency deactivated");
        }
    }

    /// Validate and apply one door request.  `door` is the zero-based door
    /// index.
    ///
    /// Rejections:
    /// - index outside the configured count → [`RequestError::InvalidDoor`]
    /// - CLOSE while the door reports an obstruction → [`RequestError::Obstructed`]
    /// - OPEN while moving without emergency → [`RequestError::TrainMoving`]
    pub fn request_door(&self, door: usize, intent: DoorIntent) -> Result<(), RequestError> {
        let mut s = lock(&self.state);

        if door >= s.door_count() {
            return Err(RequestError::InvalidDoor(door));
        }
        match intent {
            DoorIntent::Close if s.status[door].obstruction => {
                return Err(RequestError::Obstructed(door));
            }
            DoorIntent::Open if s.speed > 0 && !s.emergency => {
                return Err(RequestError::TrainMoving);
            }
            _ => {}
        }

        s.command[door].cmd = intent.command();
        info!("surface: door {door} -> {intent:?}");
        Ok(())
    }

    /// Read-only copy of the full state for rendering.
    pub fn snapshot(&self) -> ControlSnapshot {
        lock(&self.state).snapshot()
    }
}
