//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a subsystem against the
//! recording mock bus — no sockets, no threads, fully deterministic.

mod coordinator_tests;
mod mock_bus;
