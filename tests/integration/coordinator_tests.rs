//! Integration tests for the coordinator cycle against the recording bus:
//! startup wiring, status ingestion, command/heartbeat publication, failure
//! containment, and the linear lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::mock_bus::RecordingBus;
use doorhmi::codec;
use doorhmi::config::{HmiConfig, StatusFormat};
use doorhmi::coordinator::{Coordinator, Phase};
use doorhmi::state::{
    ControlState, DoorCommand, DoorState, DoorStatusEntry, DoorVec, SharedState, lock, shared,
};
use doorhmi::surface::{ControlSurface, DoorIntent};

fn test_config(doors: usize) -> HmiConfig {
    HmiConfig {
        door_count: doors,
        cycle_ms: 1,
        ..HmiConfig::default()
    }
}

struct Rig {
    bus: RecordingBus,
    state: SharedState,
    stop: Arc<AtomicBool>,
    coordinator: Coordinator<RecordingBus>,
    config: HmiConfig,
}

fn rig(config: HmiConfig) -> Rig {
    let bus = RecordingBus::new();
    let state = shared(ControlState::new(config.door_count));
    let stop = Arc::new(AtomicBool::new(false));
    let mut coordinator = Coordinator::new(
        bus.clone(),
        state.clone(),
        config.clone(),
        stop.clone(),
    );
    coordinator.start().expect("startup against mock bus");
    Rig {
        bus,
        state,
        stop,
        coordinator,
        config,
    }
}

fn status_frame(doors: usize, f: impl Fn(usize, &mut DoorStatusEntry)) -> Vec<u8> {
    let mut entries: DoorVec<DoorStatusEntry> = DoorVec::new();
    for i in 0..doors {
        let mut e = DoorStatusEntry::closed();
        f(i, &mut e);
        entries.push(e).unwrap();
    }
    codec::encode_status(&entries).to_vec()
}

// ── Startup wiring ────────────────────────────────────────────

#[test]
fn start_wires_three_status_sources_and_two_publishers() {
    let r = rig(test_config(8));
    assert_eq!(r.coordinator.phase(), Phase::Running);
    assert_eq!(r.bus.subscription_channels(), vec![2001, 2001, 2001]);
    assert_eq!(r.bus.publisher_channels(), vec![2002, 2003]);

    // One unicast listener, one per multicast group, all gateway-filtered.
    let filters = r.bus.subscription_filters();
    assert_eq!(filters[0].group, None);
    assert_eq!(filters[1].group, Some(r.config.multicast_a));
    assert_eq!(filters[2].group, Some(r.config.multicast_b));
    for f in &filters {
        assert_eq!(f.source, Some(r.config.gateway_addr.into()));
    }
}

// ── Per-cycle publish ─────────────────────────────────────────

#[test]
fn every_cycle_publishes_command_and_heartbeat() {
    let mut r = rig(test_config(4));

    r.coordinator.run_cycle();
    r.coordinator.run_cycle();

    let commands = r.bus.sent(r.config.command_channel);
    assert_eq!(commands.len(), 2);
    // Zero-initialised state: all commands NONE, all counters 0.
    assert_eq!(commands[0], vec![0u8; 32]);
    assert_eq!(commands[1], vec![0u8; 32]);

    let heartbeats = r.bus.sent(r.config.heartbeat_channel);
    assert_eq!(heartbeats.len(), 2);
    assert_eq!(heartbeats[0], vec![1, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(heartbeats[1], vec![2, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn operator_intent_reaches_the_wire_with_alive_counter() {
    let r = rig(test_config(4));
    let surface = ControlSurface::new(r.state.clone());
    let mut coordinator = r.coordinator;

    surface.request_door(2, DoorIntent::Open).unwrap();
    coordinator.run_cycle();

    let frame = r.bus.last_sent(r.config.command_channel).unwrap();
    // Door 2 entry: cmd=OPEN(1), alive=1; all other doors untouched.
    assert_eq!(&frame[16..24], &[1, 1, 0, 0, 0, 0, 0, 0]);
    assert_eq!(&frame[0..8], &[0u8; 8]);

    // Re-sending without a transition must not move the counter.
    coordinator.run_cycle();
    let frame = r.bus.last_sent(r.config.command_channel).unwrap();
    assert_eq!(&frame[16..24], &[1, 1, 0, 0, 0, 0, 0, 0]);
}

// ── Status ingestion ──────────────────────────────────────────

#[test]
fn ingested_status_replaces_the_state() {
    let mut r = rig(test_config(4));

    let frame = status_frame(4, |i, e| {
        if i == 1 {
            e.state = DoorState::Open;
            e.obstruction = true;
            e.status_counter = 42;
        }
    });
    r.bus.push_status(0, &frame);
    r.coordinator.run_cycle();

    let s = lock(&r.state);
    assert_eq!(s.status[1].state, DoorState::Open);
    assert!(s.status[1].obstruction);
    assert_eq!(s.status[1].status_counter, 42);
    assert_eq!(s.status[0].state, DoorState::Closed);
}

#[test]
fn newest_frame_wins_within_one_cycle() {
    let mut r = rig(test_config(2));

    let stale = status_frame(2, |_, e| e.status_counter = 1);
    let fresh = status_frame(2, |_, e| e.status_counter = 2);
    r.bus.push_status(0, &stale);
    r.bus.push_status(0, &fresh);
    r.coordinator.run_cycle();

    let s = lock(&r.state);
    assert_eq!(s.status[0].status_counter, 2);
}

#[test]
fn malformed_frame_is_dropped_whole() {
    let mut r = rig(test_config(4));

    r.bus.push_status(0, &[0xff; 13]); // wrong length
    r.coordinator.run_cycle();

    let s = lock(&r.state);
    for d in &s.status {
        assert_eq!(d.state, DoorState::Closed); // untouched
    }
    drop(s);

    // The cycle still published its command frame.
    assert_eq!(r.bus.sent(r.config.command_channel).len(), 1);
}

#[test]
fn legacy_mode_decodes_the_dual_format() {
    let config = HmiConfig {
        status_format: StatusFormat::Legacy,
        ..test_config(4)
    };
    let mut r = rig(config);

    // Broadcast: sentinel 0, doors [OPEN, CLOSED, OPEN, CLOSED].
    r.bus.push_status(0, &[0, 2, 1, 2, 1]);
    r.coordinator.run_cycle();
    {
        let s = lock(&r.state);
        assert_eq!(s.status[0].state, DoorState::Open);
        assert_eq!(s.status[2].state, DoorState::Open);
    }

    // Single-door: 1-based id 1 -> CLOSED.
    r.bus.push_status(1, &[1, 1]);
    r.coordinator.run_cycle();
    {
        let s = lock(&r.state);
        assert_eq!(s.status[0].state, DoorState::Closed);
        assert_eq!(s.status[2].state, DoorState::Open); // untouched
    }
}

#[test]
fn silent_status_link_goes_stale_and_recovers() {
    let config = HmiConfig {
        status_timeout_ms: 0, // any silence at all counts
        ..test_config(2)
    };
    let mut r = rig(config);

    let frame = status_frame(2, |_, _| {});
    r.bus.push_status(0, &frame);
    r.coordinator.run_cycle();
    assert!(!r.coordinator.status_stale());

    // A cycle without any status frame trips the watchdog.
    r.coordinator.run_cycle();
    assert!(r.coordinator.status_stale());

    // Commands keep flowing while stale.
    assert_eq!(r.bus.sent(r.config.command_channel).len(), 2);

    r.bus.push_status(0, &frame);
    r.coordinator.run_cycle();
    assert!(!r.coordinator.status_stale());
}

// ── Failure containment ───────────────────────────────────────

#[test]
fn publish_failure_is_contained_to_one_cycle() {
    let mut r = rig(test_config(2));

    r.bus.fail_puts(true);
    r.coordinator.run_cycle();
    assert!(r.bus.sent(r.config.command_channel).is_empty());

    // Next cycle re-sends the full authoritative state.
    r.bus.fail_puts(false);
    r.coordinator.run_cycle();
    assert_eq!(r.bus.sent(r.config.command_channel).len(), 1);
}

#[test]
fn process_pending_failure_does_not_stop_the_cycle() {
    let mut r = rig(test_config(2));

    r.bus.fail_process(true);
    r.coordinator.run_cycle();

    // The rule pass and publish still ran.
    assert_eq!(r.bus.sent(r.config.command_channel).len(), 1);
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn stop_flag_drives_linear_teardown() {
    let r = rig(test_config(2));
    let mut coordinator = r.coordinator;

    r.stop.store(true, Ordering::Relaxed);
    coordinator.run();

    assert_eq!(coordinator.phase(), Phase::Terminated);
    assert!(r.bus.session_closed());
    assert!(r.bus.terminated());
    // The stop flag was observed after exactly one cycle.
    assert_eq!(r.bus.process_calls(), 1);
}

#[test]
fn runtime_limit_stops_the_loop() {
    let config = HmiConfig {
        runtime_secs: Some(1),
        cycle_ms: 100,
        ..test_config(2)
    };
    let r = rig(config);
    let mut coordinator = r.coordinator;

    coordinator.run();

    assert_eq!(coordinator.phase(), Phase::Terminated);
    assert_eq!(r.bus.process_calls(), 10); // 1 s / 100 ms
    assert!(r.stop.load(Ordering::Relaxed));
}

// ── Override persistence on the wire ──────────────────────────

#[test]
fn motion_override_is_reasserted_every_frame() {
    let r = rig(test_config(2));
    let surface = ControlSurface::new(r.state.clone());
    let mut coordinator = r.coordinator;

    surface.set_speed(60);
    for _ in 0..3 {
        coordinator.run_cycle();
    }

    // Every transmitted frame carries CLOSE, counters stable after the
    // first transition.
    let frames = r.bus.sent(r.config.command_channel);
    assert_eq!(frames.len(), 3);
    for frame in &frames {
        assert_eq!(frame[0], DoorCommand::Close.to_wire());
        assert_eq!(frame[8], DoorCommand::Close.to_wire());
    }
    assert_eq!(frames[0][1], 1);
    assert_eq!(frames[2][1], 1);
}
