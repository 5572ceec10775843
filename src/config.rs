//! HMI configuration parameters.
//!
//! All tunable parameters for one HMI instance.  Defaults match the bench
//! deployment (host-only network, gateway at .1, HMI at .2); the binary
//! overrides them from command-line flags and calls [`HmiConfig::validate`]
//! before anything is constructed.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::state::MAX_DOORS;

/// Which on-wire form the status channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StatusFormat {
    /// Canonical aggregated frame: N fixed 8-byte entries.
    #[default]
    Aggregated,
    /// Compatibility shim for the older gateway: broadcast-sentinel or
    /// single-door frames multiplexed on one channel.
    Legacy,
}

/// Core HMI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmiConfig {
    // --- Doors ---
    /// Number of doors in the consist (1..=8).
    pub door_count: usize,

    // --- Addresses ---
    /// Own unicast address.
    pub own_addr: Ipv4Addr,
    /// Door gateway unicast address.
    pub gateway_addr: Ipv4Addr,
    /// First status multicast group.
    pub multicast_a: Ipv4Addr,
    /// Second status multicast group.
    pub multicast_b: Ipv4Addr,

    // --- Channels ---
    /// Aggregated door status, gateway -> HMI.
    pub status_channel: u16,
    /// Aggregated door command, HMI -> gateway.
    pub command_channel: u16,
    /// HMI heartbeat, HMI -> gateway.
    pub heartbeat_channel: u16,

    // --- Timing ---
    /// Cycle period (milliseconds): one ingest + rule pass + publish.
    pub cycle_ms: u64,
    /// Status staleness timeout (milliseconds).
    pub status_timeout_ms: u64,
    /// Optional runtime limit in seconds; `None` runs until quit.
    pub runtime_secs: Option<u64>,

    // --- Compatibility ---
    /// On-wire status format.
    pub status_format: StatusFormat,
}

impl Default for HmiConfig {
    fn default() -> Self {
        Self {
            door_count: MAX_DOORS,

            own_addr: Ipv4Addr::new(192, 168, 56, 2),
            gateway_addr: Ipv4Addr::new(192, 168, 56, 1),
            multicast_a: Ipv4Addr::new(239, 192, 0, 1),
            multicast_b: Ipv4Addr::new(239, 192, 0, 2),

            status_channel: 2001,
            command_channel: 2002,
            heartbeat_channel: 2003,

            cycle_ms: 100,
            status_timeout_ms: 300,
            runtime_secs: None,

            status_format: StatusFormat::default(),
        }
    }
}

impl HmiConfig {
    /// Cycle period as a `Duration`.
    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms)
    }

    /// Validate before anything is built from this config.  Invalid values
    /// are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.door_count == 0 || self.door_count > MAX_DOORS {
            return Err(ConfigError::InvalidDoorCount(self.door_count));
        }
        if self.cycle_ms == 0 {
            return Err(ConfigError::ZeroCycle);
        }

        if self.own_addr.is_multicast() || self.own_addr.is_unspecified() {
            return Err(ConfigError::NotUnicast("own_addr"));
        }
        if self.gateway_addr.is_multicast() || self.gateway_addr.is_unspecified() {
            return Err(ConfigError::NotUnicast("gateway_addr"));
        }
        if !self.multicast_a.is_multicast() {
            return Err(ConfigError::NotMulticast("multicast_a"));
        }
        if !self.multicast_b.is_multicast() {
            return Err(ConfigError::NotMulticast("multicast_b"));
        }

        let channels = [
            self.status_channel,
            self.command_channel,
            self.heartbeat_channel,
        ];
        for (i, a) in channels.iter().enumerate() {
            if channels[i + 1..].contains(a) {
                return Err(ConfigError::ChannelConflict(*a));
            }
        }

        Ok(())
    }
}
