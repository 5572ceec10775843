//! Cyclic coordinator — the periodic driver of the reconciliation core.
//!
//! ```text
//!  INIT ──start()──▶ RUNNING ──stop flag──▶ STOPPING ──teardown──▶ TERMINATED
//! ```
//!
//! One cycle in RUNNING:
//!
//! 1. bounded wait on the bus (`process_pending`, never indefinite)
//! 2. non-blocking ingest from every status subscription, last-value-wins
//! 3. lock the shared state
//! 4. apply ingested status, run the business rules
//! 5. encode + hand off the command frame and the heartbeat
//! 6. unlock, observe the stop flag
//!
//! A failed ingest or publish is logged and skipped: the next cycle
//! re-evaluates and re-sends the full authoritative state, so one lost
//! frame costs at most one cycle period.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::codec::{self, Heartbeat, LegacyStatus};
use crate::config::{HmiConfig, StatusFormat};
use crate::error::{FrameError, TransportError};
use crate::ports::{ProcessDataPort, PubHandle, SourceFilter, SubHandle};
use crate::rules::apply_rules;
use crate::state::{ControlState, DoorStatusEntry, DoorVec, SharedState, lock};

// ───────────────────────────────────────────────────────────────
// Lifecycle
// ───────────────────────────────────────────────────────────────

/// Coordinator lifecycle phase.  Strictly linear, no re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Running,
    Stopping,
    Terminated,
}

// ───────────────────────────────────────────────────────────────
// Status ingestion
// ───────────────────────────────────────────────────────────────

/// One decoded status frame, either wire generation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusUpdate {
    Aggregated(DoorVec<DoorStatusEntry>),
    Legacy(LegacyStatus),
}

fn decode_update(
    format: StatusFormat,
    buf: &[u8],
    door_count: usize,
) -> Result<StatusUpdate, FrameError> {
    match format {
        StatusFormat::Aggregated => {
            codec::decode_status(buf, door_count).map(StatusUpdate::Aggregated)
        }
        StatusFormat::Legacy => {
            codec::decode_legacy_status(buf, door_count).map(StatusUpdate::Legacy)
        }
    }
}

/// Apply one decoded update to the canonical status array.
fn apply_update(state: &mut ControlState, update: StatusUpdate) {
    match update {
        StatusUpdate::Aggregated(entries) => {
            state.status = entries;
        }
        StatusUpdate::Legacy(LegacyStatus::Broadcast(states)) => {
            for (entry, legacy) in state.status.iter_mut().zip(states.iter()) {
                if let Some(s) = legacy.canonical() {
                    entry.state = s;
                }
            }
        }
        StatusUpdate::Legacy(LegacyStatus::Single { index, state: s }) => {
            // Index was range-checked by the decoder.
            if let Some(canonical) = s.canonical() {
                state.status[index].state = canonical;
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Coordinator
// ───────────────────────────────────────────────────────────────

struct StatusSource {
    handle: SubHandle,
    name: &'static str,
}

/// The periodic driver.  Owns the bus; shares the control state with the
/// operator surface.
pub struct Coordinator<B: ProcessDataPort> {
    bus: B,
    state: SharedState,
    config: HmiConfig,
    stop: Arc<AtomicBool>,
    phase: Phase,
    heartbeat: Heartbeat,
    sources: heapless::Vec<StatusSource, 3>,
    cmd_pub: Option<PubHandle>,
    hb_pub: Option<PubHandle>,
    last_status: Option<Instant>,
    status_stale: bool,
}

impl<B: ProcessDataPort> Coordinator<B> {
    pub fn new(bus: B, state: SharedState, config: HmiConfig, stop: Arc<AtomicBool>) -> Self {
        Self {
            bus,
            state,
            config,
            stop,
            phase: Phase::Init,
            heartbeat: Heartbeat::new(),
            sources: heapless::Vec::new(),
            cmd_pub: None,
            hb_pub: None,
            last_status: None,
            status_stale: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the status link has been silent longer than the configured
    /// timeout.  Stale status is logged, not acted on: the command side
    /// keeps publishing the authoritative state regardless.
    pub fn status_stale(&self) -> bool {
        self.status_stale
    }

    /// Bring up the bus: session, three status subscriptions (unicast plus
    /// both multicast groups), command and heartbeat publishers.  Any
    /// failure here is fatal — there is no degraded mode at startup.
    pub fn start(&mut self) -> Result<(), TransportError> {
        debug_assert_eq!(self.phase, Phase::Init);

        self.bus.init()?;
        self.bus.open_session()?;

        let gateway = std::net::IpAddr::V4(self.config.gateway_addr);
        let subs: [(&'static str, SourceFilter); 3] = [
            ("unicast", SourceFilter::unicast_from(gateway)),
            (
                "multicast-A",
                SourceFilter::multicast_from(self.config.multicast_a, gateway),
            ),
            (
                "multicast-B",
                SourceFilter::multicast_from(self.config.multicast_b, gateway),
            ),
        ];
        for (name, filter) in subs {
            let handle = self.bus.subscribe(self.config.status_channel, filter)?;
            let _ = self.sources.push(StatusSource { handle, name });
        }

        let period = self.config.cycle();
        self.cmd_pub = Some(self.bus.publish(self.config.command_channel, period)?);
        self.hb_pub = Some(self.bus.publish(self.config.heartbeat_channel, period)?);

        self.phase = Phase::Running;
        self.last_status = Some(Instant::now());
        info!(
            "coordinator: RUNNING ({} doors, cycle {} ms, status format {:?})",
            self.config.door_count, self.config.cycle_ms, self.config.status_format
        );
        Ok(())
    }

    /// Run cycles until the stop flag is set or the configured runtime
    /// limit expires, then tear down.
    pub fn run(&mut self) {
        debug_assert_eq!(self.phase, Phase::Running);

        let max_cycles = self
            .config
            .runtime_secs
            .map(|secs| (secs * 1000).div_ceil(self.config.cycle_ms));
        let mut cycles: u64 = 0;

        loop {
            self.run_cycle();
            cycles += 1;

            if self.stop.load(Ordering::Relaxed) {
                info!("coordinator: stop requested");
                break;
            }
            if let Some(max) = max_cycles {
                if cycles >= max {
                    info!("coordinator: runtime limit reached after {cycles} cycles");
                    self.stop.store(true, Ordering::Relaxed);
                    break;
                }
            }
        }

        self.shutdown();
    }

    /// One full cycle.  Public so tests can step the coordinator without a
    /// thread.
    pub fn run_cycle(&mut self) {
        // 1. Bounded wait — the only blocking point of the loop.
        if let Err(e) = self.bus.process_pending(self.config.cycle()) {
            warn!("coordinator: process_pending failed: {e}");
        }

        // 2. Ingest outside the lock.  Last-value-wins per source; a frame
        //    that fails to decode is dropped whole.
        let mut updates: heapless::Vec<StatusUpdate, 3> = heapless::Vec::new();
        for source in &self.sources {
            let Some(frame) = self.bus.get(source.handle) else {
                continue;
            };
            match decode_update(
                self.config.status_format,
                &frame.payload,
                self.config.door_count,
            ) {
                Ok(update) => {
                    debug!(
                        "coordinator: status from {} ({} bytes{})",
                        source.name,
                        frame.payload.len(),
                        frame
                            .source
                            .map(|a| format!(", src {a}"))
                            .unwrap_or_default(),
                    );
                    let _ = updates.push(update);
                }
                Err(e) => warn!("coordinator: dropping frame from {}: {e}", source.name),
            }
        }
        self.track_staleness(!updates.is_empty());

        // 3.–5. Critical section: apply status, evaluate rules, encode and
        // hand off.  `put` is a buffer handoff, not I/O.
        {
            let mut s = lock(&self.state);
            for update in updates {
                apply_update(&mut s, update);
            }

            let transitions = apply_rules(&mut s);
            if transitions > 0 {
                debug!("coordinator: {transitions} command transition(s)");
            }

            let cmd_frame = codec::encode_command(&s.command);
            drop(s);

            if let Some(handle) = self.cmd_pub {
                if let Err(e) = self.bus.put(handle, &cmd_frame) {
                    warn!("coordinator: command publish failed: {e}");
                }
            }
            if let Some(handle) = self.hb_pub {
                let hb = self.heartbeat.next_frame();
                if let Err(e) = self.bus.put(handle, &hb) {
                    warn!("coordinator: heartbeat publish failed: {e}");
                }
            }
        }
    }

    /// Update the staleness watchdog after one cycle's ingest.
    fn track_staleness(&mut self, got_status: bool) {
        if got_status {
            self.last_status = Some(Instant::now());
            if self.status_stale {
                info!("coordinator: status link recovered");
                self.status_stale = false;
            }
            return;
        }

        let timeout = Duration::from_millis(self.config.status_timeout_ms);
        let silent_for = self.last_status.map(|t| t.elapsed());
        if !self.status_stale && silent_for.is_some_and(|d| d > timeout) {
            warn!(
                "coordinator: no status for {} ms, marking stale",
                self.config.status_timeout_ms
            );
            self.status_stale = true;
        }
    }

    /// Tear the bus down and terminate.  Teardown failures are logged, not
    /// propagated — the process is exiting either way.
    fn shutdown(&mut self) {
        self.phase = Phase::Stopping;
        info!("coordinator: STOPPING");

        if let Err(e) = self.bus.close_session() {
            warn!("coordinator: close_session failed: {e}");
        }
        self.bus.terminate();

        self.phase = Phase::Terminated;
        info!("coordinator: TERMINATED");
    }
}
