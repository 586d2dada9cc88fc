//! Port traits — the hexagonal boundary between core logic and the
//! outside world.
//!
//! ```text
//!   Adapter (hw or sim) ──▶ Port trait ──▶ LineEngine / SectorCache (core)
//! ```
//!
//! Hardware adapters (real GPIO/PIO/DMA, real flash) and simulation
//! adapters (in-memory, host-testable) both implement these traits; the
//! core never references a concrete adapter type directly.

pub use crate::clock::Clock;

/// Drives the two physical wires of one Maple-style bus.
///
/// An implementation owns its GPIO pins and DMA channels for the life of
/// the program. `start_write`/`start_read` are non-blocking: completion is
/// reported back to the owning [`crate::bus::LineEngine`] by calling
/// `on_write_complete`/`on_read_complete`, either from a real interrupt
/// handler or, in simulation, directly by the test driving the engine.
pub trait LineTransceiver {
    /// Samples both lines; `true` if neither is being pulled low.
    fn probe_idle(&mut self) -> bool;

    /// Begins clocking `wire_bytes` onto the line. Any transfer left over
    /// from a previous transaction on this instance must be aborted first.
    fn start_write(&mut self, wire_bytes: &[u8]);

    /// Aborts an in-progress write, e.g. on deadline expiry.
    fn abort_write(&mut self);

    /// Arms the receive path. Implementations must clear the capture
    /// buffer first so a short reply can't be validated against stale
    /// bytes from a previous transaction.
    fn start_read(&mut self);

    /// Aborts an in-progress read, e.g. on deadline expiry.
    fn abort_read(&mut self);

    /// The raw bytes captured by the most recent (or in-progress) read.
    fn capture_bytes(&self) -> &[u8];
}

/// A blocking flash erase/program primitive for one managed region.
///
/// `erase_sector` and `program_sector` block for the duration of the
/// underlying hardware operation; callers (the sector cache's background
/// step) are expected to run them off the real-time execution context.
pub trait FlashDevice {
    /// Reads `len` bytes starting at `offset`, used once at construction
    /// to seed a RAM shadow from whatever is already on flash.
    fn read_initial(&self, offset: usize, len: usize) -> Vec<u8>;

    /// Erases `sector_size` bytes starting at `flash_byte_offset`. Blocking.
    fn erase_sector(&mut self, flash_byte_offset: usize, sector_size: usize) -> Result<(), crate::error::FlashError>;

    /// Programs `data` starting at `flash_byte_offset`. Blocking. The
    /// caller guarantees the target sector was erased first.
    fn program_sector(&mut self, flash_byte_offset: usize, data: &[u8]) -> Result<(), crate::error::FlashError>;
}
