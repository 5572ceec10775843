//! Door-control HMI library.
//!
//! The cyclic safety-reconciliation core for a train-car door HMI: shared
//! control state, the per-cycle business rule engine, the aggregated frame
//! codec, and the coordinator that drives them against a process-data bus.
//! Concrete UDP and console adapters live under [`adapters`]; everything
//! else is transport- and UI-agnostic.

#![deny(unused_must_use)]

pub mod adapters;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod ports;
pub mod rules;
pub mod state;
pub mod surface;
