//! Concrete adapters for the two boundary contracts: the UDP process-data
//! bus (behind [`ProcessDataPort`](crate::ports::ProcessDataPort)) and the
//! line-based operator console (driving the control surface).

pub mod console;
pub mod udp;
