//! Monotonic microsecond clock port.
//!
//! - **`feature = "hw"`** — wraps `esp_timer_get_time()`, the ESP-IDF
//!   high-resolution timer (microsecond precision, monotonic).
//! - **default** — wraps `std::time::Instant` for host-side testing and
//!   simulation.

/// A monotonic microsecond clock. Implementations must never go backwards
/// and must tolerate wraparound at `u64::MAX` the way `proc_kill_time`
/// comparisons do.
pub trait Clock {
    /// Microseconds elapsed since some fixed but arbitrary epoch.
    fn now_us(&self) -> u64;
}

/// Host/simulation clock backed by [`std::time::Instant`].
pub struct SystemClock {
    #[cfg(not(feature = "hw"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "hw"))]
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "hw")]
impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        (unsafe { esp_idf_sys::esp_timer_get_time() }) as u64
    }
}

#[cfg(not(feature = "hw"))]
impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}
