//! Fuzz target: the status decoders.
//!
//! Drives arbitrary byte sequences through both the aggregated and the
//! legacy status decoder for every supported door count and asserts that
//! they never panic, never accept a wrong-length aggregated frame, and
//! never hand back an out-of-range legacy door index.
//!
//! cargo fuzz run fuzz_status_decoder

#![no_main]

use doorhmi::codec::{LegacyStatus, decode_legacy_status, decode_status};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for doors in 1..=8usize {
        match decode_status(data, doors) {
            Ok(entries) => {
                assert_eq!(data.len(), doors * 8);
                assert_eq!(entries.len(), doors);
            }
            Err(_) => {}
        }

        match decode_legacy_status(data, doors) {
            Ok(LegacyStatus::Broadcast(states)) => {
                assert!(states.len() <= doors);
            }
            Ok(LegacyStatus::Single { index, .. }) => {
                assert!(index < doors);
            }
            Err(_) => {}
        }
    }
});
