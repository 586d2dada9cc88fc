//! The sector cache: RAM-shadowed reads/writes with a background
//! erase/program state machine.

use std::sync::Mutex;

use crate::config::FlashGeometry;
use crate::error::FlashError;
use crate::ports::FlashDevice;

/// The background programmer's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Idle,
    Erasing,
    DelayingWrite,
}

struct Shared {
    shadow: Vec<u8>,
    dirty: Vec<usize>,
    state: CacheState,
    delayed_write_time: u64,
}

/// A write-back RAM shadow of a flash region, with asynchronous background
/// programming driven by periodic calls to [`SectorCache::process`].
///
/// `read`/`write` are synchronous and always reflect the most recent
/// write, regardless of how far behind the background programmer is.
pub struct SectorCache<F: FlashDevice> {
    flash: Mutex<F>,
    shared: Mutex<Shared>,
    geometry: FlashGeometry,
}

impl<F: FlashDevice> SectorCache<F> {
    /// Seeds the RAM shadow from whatever is already on `flash`.
    ///
    /// # Panics
    ///
    /// Panics (via [`crate::error::fatal`]) if `geometry` asks for more
    /// sectors than [`super::MAX_SECTORS`] — the dirty-sector queue and
    /// background programmer assume every sector index fits in that range.
    pub fn new(flash: F, geometry: FlashGeometry) -> Self {
        if geometry.region_len_sectors > super::MAX_SECTORS {
            crate::error::fatal(&format!(
                "flash geometry requests {} sectors, exceeding the {} sector cap",
                geometry.region_len_sectors,
                super::MAX_SECTORS
            ));
        }
        let initial = flash.read_initial(geometry.region_offset, geometry.total_bytes());
        Self {
            flash: Mutex::new(flash),
            shared: Mutex::new(Shared {
                shadow: initial,
                dirty: Vec::new(),
                state: CacheState::Idle,
                delayed_write_time: 0,
            }),
            geometry,
        }
    }

    pub fn get_memory_size(&self) -> usize {
        self.geometry.total_bytes()
    }

    pub fn state(&self) -> CacheState {
        self.shared.lock().unwrap().state
    }

    /// Returns a copy of `len` bytes starting at `offset`, clamped to what
    /// remains in the shadow.
    pub fn read(&self, offset: usize, len: usize) -> Vec<u8> {
        let shared = self.shared.lock().unwrap();
        let end = (offset + len).min(shared.shadow.len());
        if offset >= end {
            return Vec::new();
        }
        shared.shadow[offset..end].to_vec()
    }

    /// Updates the RAM shadow and marks every touched sector dirty.
    ///
    /// A write that touches the sector currently being programmed (the
    /// queue head) extends the delayed-write timer; a write that adds a
    /// brand-new dirty sector clears the delay so programming resumes
    /// immediately.
    pub fn write(&self, offset: usize, data: &[u8], now_us: u64) -> Result<(), FlashError> {
        let mut shared = self.shared.lock().unwrap();
        let end = (offset + data.len()).min(shared.shadow.len());
        if offset >= end {
            return Err(FlashError::OutOfRange);
        }
        let written = end - offset;
        shared.shadow[offset..end].copy_from_slice(&data[..written]);

        let sector_size = self.geometry.sector_size;
        let first_sector = offset / sector_size;
        let last_sector = (end - 1) / sector_size;

        let mut item_added = false;
        let mut delay_write = false;
        for sector in first_sector..=last_sector {
            match shared.dirty.iter().position(|&s| s == sector) {
                None => {
                    shared.dirty.push(sector);
                    item_added = true;
                }
                Some(0) => delay_write = true,
                Some(_) => {}
            }
        }

        if item_added {
            shared.delayed_write_time = 0;
        } else if delay_write {
            shared.delayed_write_time = now_us + self.geometry.write_delay_us;
        }

        Ok(())
    }

    /// The background step. Intended to be called periodically from a
    /// context that can tolerate the blocking erase below.
    pub fn process(&self, now_us: u64) {
        let mut shared = self.shared.lock().unwrap();
        match shared.state {
            CacheState::Idle => {
                let Some(&sector) = shared.dirty.first() else {
                    return;
                };
                let flash_byte = self.geometry.region_offset + sector * self.geometry.sector_size;
                shared.delayed_write_time = now_us + self.geometry.write_delay_us;
                shared.state = CacheState::Erasing;
                log::debug!("storage: erasing sector {sector}");

                // Drop the lock before the blocking erase so `write` can
                // keep updating the shadow and queueing further sectors.
                drop(shared);
                let erase_result = self.flash.lock().unwrap().erase_sector(flash_byte, self.geometry.sector_size);
                if let Err(e) = erase_result {
                    crate::error::fatal(&format!("flash erase failed: {e}"));
                }
            }
            CacheState::Erasing => {
                shared.state = CacheState::DelayingWrite;
                self.drain_delaying_write(shared, now_us);
            }
            CacheState::DelayingWrite => {
                self.drain_delaying_write(shared, now_us);
            }
        }
    }

    fn drain_delaying_write(&self, mut shared: std::sync::MutexGuard<'_, Shared>, now_us: u64) {
        if now_us < shared.delayed_write_time {
            return;
        }
        let Some(&sector) = shared.dirty.first() else {
            crate::error::fatal("sector queue empty while delaying write");
        };
        let sector_size = self.geometry.sector_size;
        let local_offset = sector * sector_size;
        let mut buf = heapless::Vec::<u8, { super::MAX_SECTOR_SIZE }>::new();
        let _ = buf.extend_from_slice(&shared.shadow[local_offset..local_offset + sector_size]);
        let flash_byte = self.geometry.region_offset + local_offset;

        drop(shared);
        let program_result = self.flash.lock().unwrap().program_sector(flash_byte, &buf);
        if let Err(e) = program_result {
            crate::error::fatal(&format!("flash program failed: {e}"));
        }

        let mut shared = self.shared.lock().unwrap();
        shared.dirty.remove(0);
        shared.state = CacheState::Idle;
        log::debug!("storage: programmed sector {sector}");
    }
}
