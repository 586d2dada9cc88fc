//! Unified error types for the Maple bus core.
//!
//! Follows the same shape the surrounding firmware corpus uses: a single
//! `Error` enum that every subsystem funnels into, keeping callers' error
//! handling uniform. Variants are `Copy` so they pass cheaply through the
//! real-time loop without allocation.

use core::fmt;

/// Every fallible operation in this crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Line engine or scheduler rejected an operation: the resource is busy.
    Bus(BusError),
    /// The flash-backed sector cache rejected an operation.
    Flash(FlashError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Flash(e) => write!(f, "flash: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// A write or read was already in progress.
    Busy,
    /// The bus was sensed active during the open-line pre-check window.
    LineNotIdle,
    /// A transaction's deadline elapsed before it completed.
    Timeout,
    /// A received frame's checksum did not match its payload.
    CrcMismatch,
    /// A received frame was too short, or carried an invalid command byte.
    MalformedFrame,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "write or read already in progress"),
            Self::LineNotIdle => write!(f, "line not idle"),
            Self::Timeout => write!(f, "transaction timed out"),
            Self::CrcMismatch => write!(f, "CRC mismatch"),
            Self::MalformedFrame => write!(f, "malformed frame"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Flash errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    /// An offset or length fell outside the managed region.
    OutOfRange,
    /// The underlying hardware reported an erase or program failure.
    HardwareFault,
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "offset out of range"),
            Self::HardwareFault => write!(f, "flash hardware fault"),
        }
    }
}

impl From<FlashError> for Error {
    fn from(e: FlashError) -> Self {
        Self::Flash(e)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Logs an invariant violation or hardware fault at `error` level and aborts.
///
/// Used for conditions the design treats as impossible (a missing queue
/// head) or unrecoverable (a flash program failure) rather than threaded
/// back through `Result`.
#[cold]
pub fn fatal(context: &str) -> ! {
    log::error!("fatal: {context}");
    panic!("fatal: {context}");
}
