//! Business rule engine — the safety core.
//!
//! Runs **every cycle with the state lock held**, independent of whether new
//! operator input arrived.  Overrides are therefore re-asserted in every
//! transmitted frame: a momentarily lost frame cannot leave the actuator
//! with a stale unsafe command, the next cycle re-sends the authoritative
//! state.
//!
//! Priority order per door:
//!
//! 1. `emergency`      → OPEN, unconditionally
//! 2. `speed > 0`      → CLOSE
//! 3. otherwise        → operator-selected command, pass-through
//!
//! The per-door alive counter increments by exactly 1 (mod 256) when and
//! only when the resolved command differs from the previous pass's resolved
//! value.  A stuck or double-incrementing counter desynchronises the door
//! actuator's acceptance logic, so the transition detection lives here and
//! nowhere else.

use log::debug;

use crate::state::{ControlState, DoorCommand};

/// Evaluate the rules once, writing the resolved commands and counter
/// increments back into `state`.  Returns the number of doors whose
/// resolved command changed this pass.
pub fn apply_rules(state: &mut ControlState) -> usize {
    let mut transitions = 0;

    for d in 0..state.door_count() {
        let desired = state.command[d].cmd;

        let resolved = if state.emergency {
            DoorCommand::Open
        } else if state.speed > 0 {
            DoorCommand::Close
        } else {
            desired
        };

        if resolved != state.prev_resolved[d] {
            state.command[d].alive_counter = state.command[d].alive_counter.wrapping_add(1);
            state.prev_resolved[d] = resolved;
            transitions += 1;
            debug!(
                "rules: door {d} {:?} -> {:?} (alive={})",
                desired, resolved, state.command[d].alive_counter
            );
        }
        state.command[d].cmd = resolved;
    }

    transitions
}
