//! Door-control HMI — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Console (stdin, main thread)    UdpBus (gateway network) │
//! │        │                               │                 │
//! │  ControlSurface                  Coordinator thread      │
//! │        └────────── SharedState ────────┘                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The coordinator runs on its own thread; the console owns the main
//! thread.  Either side raises the shared stop flag (quit command, runtime
//! limit) and both wind down within one cycle period.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use doorhmi::adapters::console::Console;
use doorhmi::adapters::udp::UdpBus;
use doorhmi::config::{HmiConfig, StatusFormat};
use doorhmi::coordinator::Coordinator;
use doorhmi::state::{ControlState, shared};
use doorhmi::surface::ControlSurface;

#[derive(Debug, Parser)]
#[command(name = "doorhmi", version, about = "Train-car door control HMI")]
struct Args {
    /// Own unicast address.
    #[arg(long, default_value = "192.168.56.2")]
    own: Ipv4Addr,

    /// Door gateway address.
    #[arg(long, default_value = "192.168.56.1")]
    gateway: Ipv4Addr,

    /// First status multicast group.
    #[arg(long, default_value = "239.192.0.1")]
    mc_a: Ipv4Addr,

    /// Second status multicast group.
    #[arg(long, default_value = "239.192.0.2")]
    mc_b: Ipv4Addr,

    /// Number of doors in the consist (1-8).
    #[arg(long, default_value_t = 8)]
    doors: usize,

    /// Cycle period in milliseconds.
    #[arg(long, default_value_t = 100)]
    cycle_ms: u64,

    /// Stop after this many seconds (runs until `quit` if omitted).
    #[arg(long)]
    runtime: Option<u64>,

    /// Speak the legacy dual-format status protocol of the older gateway.
    #[arg(long)]
    legacy_status: bool,
}

impl Args {
    fn into_config(self) -> HmiConfig {
        HmiConfig {
            door_count: self.doors,
            own_addr: self.own,
            gateway_addr: self.gateway,
            multicast_a: self.mc_a,
            multicast_b: self.mc_b,
            cycle_ms: self.cycle_ms,
            runtime_secs: self.runtime,
            status_format: if self.legacy_status {
                StatusFormat::Legacy
            } else {
                StatusFormat::Aggregated
            },
            ..HmiConfig::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    config.validate().context("invalid configuration")?;

    info!(
        "doorhmi v{}: own={} gateway={} doors={}",
        env!("CARGO_PKG_VERSION"),
        config.own_addr,
        config.gateway_addr,
        config.door_count
    );

    let state = shared(ControlState::new(config.door_count));
    let stop = Arc::new(AtomicBool::new(false));

    // Coordinator: bring the bus up on the main thread so startup failures
    // abort before anything else runs, then hand the loop to its own thread.
    let bus = UdpBus::new(config.own_addr, config.gateway_addr);
    let mut coordinator = Coordinator::new(bus, state.clone(), config, stop.clone());
    coordinator.start().context("transport startup failed")?;

    let coordinator_thread = std::thread::Builder::new()
        .name("coordinator".into())
        .spawn(move || coordinator.run())
        .context("failed to spawn coordinator thread")?;

    // Console owns the main thread until quit/EOF, then raises the stop
    // flag the coordinator observes at its next cycle boundary.
    let console = Console::new(ControlSurface::new(state));
    console.run(&stop);

    coordinator_thread
        .join()
        .map_err(|_| anyhow::anyhow!("coordinator thread panicked"))?;

    info!("doorhmi: shut down cleanly");
    Ok(())
}
