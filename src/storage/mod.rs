//! Flash-backed sector cache: a write-back RAM shadow with asynchronous
//! background programming.

mod cache;
mod flash;

pub use cache::{CacheState, SectorCache};
pub use flash::SimFlash;

#[cfg(feature = "hw")]
pub use flash::EspFlash;

/// Compile-time cap on sector size, required because the in-RAM shadow and
/// the program-buffer use `heapless`, fixed-capacity collections.
pub const MAX_SECTOR_SIZE: usize = 4096;

/// Compile-time cap on the number of sectors a single cache instance may manage.
pub const MAX_SECTORS: usize = 64;
