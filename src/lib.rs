//! A hard real-time Maple-style bus core: a half-duplex two-wire line
//! engine, a priority/deadline transmission scheduler, and a flash-backed
//! sector cache with asynchronous background programming.
//!
//! The crate is a library with no bootstrap sequence or application loop
//! of its own — instances are constructed in-process by the embedding
//! application, which owns pin assignments, flash offsets, and the
//! real-time/background execution contexts that drive them. All
//! ESP-IDF-specific adapters are behind the `hw` feature; the default
//! build uses the simulation adapters and is fully host-testable.

#![deny(unused_must_use)]

pub mod bus;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod ports;
pub mod scheduler;
pub mod storage;
