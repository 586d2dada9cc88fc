//! Runtime configuration for the Maple bus core.
//!
//! The core never reads a CLI flag or environment variable: every tunable
//! lives on a plain value the embedding application constructs and passes
//! in. Typical values for a Dreamcast-class bus are exposed as `const fn`
//! defaults so a caller who doesn't need to deviate from them gets a
//! working configuration for free.

use serde::{Deserialize, Serialize};

/// Line-level timing parameters for one physical bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusTiming {
    /// CPU clock used for the timing calculations below, in kHz.
    pub cpu_freq_khz: u32,
    /// Minimum time between signal edges, in nanoseconds.
    pub min_clock_period_ns: u32,
    /// How long the open-line pre-check samples both lines before a write, in microseconds.
    pub open_line_check_time_us: u32,
    /// Percentage inflation applied to the computed write deadline.
    pub write_timeout_extra_percent: u32,
    /// Deadline for a response after a write completes, in microseconds.
    pub read_timeout_us: u64,
}

impl BusTiming {
    /// Typical parameters for a 2 Mbit/s two-wire bus on a 133 MHz core.
    pub const fn dreamcast_defaults() -> Self {
        Self {
            cpu_freq_khz: 133_000,
            min_clock_period_ns: 320,
            open_line_check_time_us: 2,
            write_timeout_extra_percent: 20,
            read_timeout_us: 3_000,
        }
    }
}

impl Default for BusTiming {
    fn default() -> Self {
        Self::dreamcast_defaults()
    }
}

/// Geometry of the flash region a [`crate::storage::SectorCache`] manages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlashGeometry {
    /// Size of one erase/program unit, in bytes.
    pub sector_size: usize,
    /// Byte offset of the managed region within the flash device.
    pub region_offset: usize,
    /// Number of sectors in the managed region.
    pub region_len_sectors: usize,
    /// Delay, in microseconds, a dirty sector waits before being programmed,
    /// to coalesce rapid successive writes into one erase/program cycle.
    pub write_delay_us: u64,
}

impl FlashGeometry {
    /// A single 4 KiB sector at the start of the device with a 200 ms coalescing delay.
    pub const fn single_sector_defaults() -> Self {
        Self {
            sector_size: 4096,
            region_offset: 0,
            region_len_sectors: 1,
            write_delay_us: 200_000,
        }
    }

    /// Total size in bytes of the managed region.
    pub const fn total_bytes(&self) -> usize {
        self.sector_size * self.region_len_sectors
    }
}

impl Default for FlashGeometry {
    fn default() -> Self {
        Self::single_sector_defaults()
    }
}

/// Top-level configuration bundle threaded through construction of the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub bus_timing: BusTiming,
    pub flash_geometry: FlashGeometry,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            bus_timing: BusTiming::default(),
            flash_geometry: FlashGeometry::default(),
        }
    }
}
