//! Fuzz target: `frame::validate_received`
//!
//! Drives arbitrary byte sequences into the receive-validation path and
//! asserts that it never panics and never returns a frame whose payload
//! length disagrees with the wire length byte.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use maple_bus_core::frame::validate_received;

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = validate_received(data) {
        assert_eq!(frame.payload.len(), data[0] as usize);
    }
});
