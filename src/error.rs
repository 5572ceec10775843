//! Unified error types for the door-control HMI.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level handling uniform: startup errors abort the process, runtime
//! transport errors stay inside the coordinator, request rejections go back
//! to the operator surface.  All variants are `Copy` so they can be passed
//! around without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Startup parameters are invalid.  Fatal before RUNNING.
    Config(ConfigError),
    /// The process-data bus failed.  Fatal at startup, logged at runtime.
    Transport(TransportError),
    /// An operator request was rejected.  State unchanged.
    Request(RequestError),
    /// A received frame is malformed.  Frame dropped whole, state unchanged.
    Frame(FrameError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Request(e) => write!(f, "request: {e}"),
            Self::Frame(e) => write!(f, "frame: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Door count outside the supported 1..=8 range.
    InvalidDoorCount(usize),
    /// The cycle period must be non-zero.
    ZeroCycle,
    /// Two process-data channels share the same id.
    ChannelConflict(u16),
    /// An address that must be unicast is not (`&str` names the field).
    NotUnicast(&'static str),
    /// An address that must be multicast is not.
    NotMulticast(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDoorCount(n) => write!(f, "door count {n} outside 1..=8"),
            Self::ZeroCycle => write!(f, "cycle period must be non-zero"),
            Self::ChannelConflict(id) => write!(f, "channel id {id} used twice"),
            Self::NotUnicast(field) => write!(f, "{field} must be a unicast address"),
            Self::NotMulticast(field) => write!(f, "{field} must be a multicast address"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Underlying socket operation failed.
    Io(std::io::ErrorKind),
    /// An operation was issued before `open_session` or after `close_session`.
    SessionClosed,
    /// A put/get referenced a handle this bus never issued.
    UnknownHandle,
    /// Payload exceeds the fixed process-data frame size.
    PayloadTooLarge(usize),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "I/O error: {kind:?}"),
            Self::SessionClosed => write!(f, "session not open"),
            Self::UnknownHandle => write!(f, "unknown handle"),
            Self::PayloadTooLarge(n) => write!(f, "payload of {n} bytes exceeds frame size"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

// ---------------------------------------------------------------------------
// Operator request rejections
// ---------------------------------------------------------------------------

/// Typed rejection returned by the control-surface adapter.  The three
/// variants must stay distinguishable — the operator surface renders them
/// differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// Door index outside the configured door count.
    InvalidDoor(usize),
    /// CLOSE refused: the door reports an obstruction.
    Obstructed(usize),
    /// OPEN refused: the train is moving and no emergency is active.
    TrainMoving,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDoor(id) => write!(f, "invalid door index {id}"),
            Self::Obstructed(id) => write!(f, "door {id} obstructed, cannot close"),
            Self::TrainMoving => write!(f, "train is moving, cannot open"),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<RequestError> for Error {
    fn from(e: RequestError) -> Self {
        Self::Request(e)
    }
}

// ---------------------------------------------------------------------------
// Frame decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer length does not match entry count × entry size.
    SizeMismatch { expected: usize, got: usize },
    /// Unknown door-state discriminant on the wire.
    UnknownState(u8),
    /// Unknown command discriminant on the wire.
    UnknownCommand(u8),
    /// Legacy single-door update carries an id outside 1..=N.
    BadDoorId(u8),
    /// Legacy frame shorter than the 2-byte minimum.
    TooShort(usize),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { expected, got } => {
                write!(f, "size mismatch: expected {expected} bytes, got {got}")
            }
            Self::UnknownState(b) => write!(f, "unknown door state 0x{b:02x}"),
            Self::UnknownCommand(b) => write!(f, "unknown command 0x{b:02x}"),
            Self::BadDoorId(id) => write!(f, "legacy door id {id} out of range"),
            Self::TooShort(n) => write!(f, "legacy frame of {n} bytes too short"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
