//! The Maple-style line engine: one instance per physical two-wire bus.

mod engine;
mod transceiver;

pub use engine::{BusState, LineEngine};
pub use transceiver::SimTransceiver;

#[cfg(feature = "hw")]
pub use transceiver::EspLineTransceiver;
