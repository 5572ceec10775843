//! Port traits — the boundary between the reconciliation core and the
//! outside world.
//!
//! ```text
//!   process-data bus adapter ──▶ ProcessDataPort ──▶ Coordinator (core)
//! ```
//!
//! The coordinator consumes the bus exclusively through [`ProcessDataPort`],
//! so it is agnostic to how the transport frames, retries, or addresses
//! packets.  The contract is deliberately narrow: fixed-size payload
//! transfer, bounded waits, last-value delivery.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::TransportError;

/// Largest process-data payload the core ever moves (8 doors * 8 bytes).
pub const MAX_PAYLOAD: usize = 64;

/// Payload buffer handed across the port.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD>;

/// Opaque subscription handle issued by [`ProcessDataPort::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubHandle(pub usize);

/// Opaque publisher handle issued by [`ProcessDataPort::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubHandle(pub usize);

/// Reception scope of one subscription: which source to accept frames from
/// and, for multicast reception, which group to join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceFilter {
    /// Accept frames from this source only; `None` accepts any source.
    pub source: Option<IpAddr>,
    /// Join this multicast group; `None` listens unicast.
    pub group: Option<Ipv4Addr>,
}

impl SourceFilter {
    /// Unicast reception restricted to one source.
    pub fn unicast_from(source: IpAddr) -> Self {
        Self {
            source: Some(source),
            group: None,
        }
    }

    /// Multicast reception on `group`, restricted to one source.
    pub fn multicast_from(group: Ipv4Addr, source: IpAddr) -> Self {
        Self {
            source: Some(source),
            group: Some(group),
        }
    }
}

/// One received frame plus its source metadata.
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub payload: Payload,
    /// Where the frame came from, when the bus knows.
    pub source: Option<SocketAddr>,
}

/// The process-data bus as seen by the coordinator.
///
/// Lifecycle: `init` → `open_session` → `subscribe`/`publish` (startup only)
/// → any number of `process_pending`/`put`/`get` cycles → `close_session` →
/// `terminate`.  Startup failures are fatal; per-cycle `put`/`get` failures
/// are logged by the caller and the next cycle re-sends the full state.
pub trait ProcessDataPort {
    /// One-time stack initialisation.
    fn init(&mut self) -> Result<(), TransportError>;

    /// Open the communication session.
    fn open_session(&mut self) -> Result<(), TransportError>;

    /// Subscribe to `channel` with the given reception scope.
    fn subscribe(&mut self, channel: u16, filter: SourceFilter)
    -> Result<SubHandle, TransportError>;

    /// Create a cyclic publisher on `channel` with the given re-send period.
    fn publish(&mut self, channel: u16, period: Duration) -> Result<PubHandle, TransportError>;

    /// Hand the latest payload to a publisher.  Non-blocking buffer handoff;
    /// actual transmission belongs to the bus.
    fn put(&mut self, handle: PubHandle, payload: &[u8]) -> Result<(), TransportError>;

    /// Non-blocking fetch of the newest frame on a subscription, if any
    /// arrived since the last call.  Last-value-wins: the bus never queues.
    fn get(&mut self, handle: SubHandle) -> Option<ReceivedFrame>;

    /// Drive the bus for at most `wait`.  This is the coordinator's only
    /// blocking point and is always bounded.
    fn process_pending(&mut self, wait: Duration) -> Result<(), TransportError>;

    /// Close the session.  Handles become invalid.
    fn close_session(&mut self) -> Result<(), TransportError>;

    /// Final teardown.  Infallible by design: there is nothing useful to do
    /// with a teardown error at process exit.
    fn terminate(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Null bus
// ───────────────────────────────────────────────────────────────

/// A bus that accepts everything and receives nothing.  Used for wiring
/// checks and as the default collaborator in tests that only exercise the
/// state path.
#[derive(Debug, Default)]
pub struct NullBus {
    handles: usize,
    open: bool,
}

impl NullBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessDataPort for NullBus {
    fn init(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn open_session(&mut self) -> Result<(), TransportError> {
        self.open = true;
        Ok(())
    }

    fn subscribe(
        &mut self,
        _channel: u16,
        _filter: SourceFilter,
    ) -> Result<SubHandle, TransportError> {
        if !self.open {
            return Err(TransportError::SessionClosed);
        }
        self.handles += 1;
        Ok(SubHandle(self.handles))
    }

    fn publish(&mut self, _channel: u16, _period: Duration) -> Result<PubHandle, TransportError> {
        if !self.open {
            return Err(TransportError::SessionClosed);
        }
        self.handles += 1;
        Ok(PubHandle(self.handles))
    }

    fn put(&mut self, _handle: PubHandle, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(TransportError::PayloadTooLarge(payload.len()));
        }
        Ok(())
    }

    fn get(&mut self, _handle: SubHandle) -> Option<ReceivedFrame> {
        None
    }

    fn process_pending(&mut self, wait: Duration) -> Result<(), TransportError> {
        std::thread::sleep(wait);
        Ok(())
    }

    fn close_session(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }

    fn terminate(&mut self) {}
}
