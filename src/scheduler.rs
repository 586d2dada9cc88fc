//! The transmission scheduler: a priority + deadline + non-overlap ordered
//! queue of pending frames.
//!
//! Insertion keeps three rules satisfied together: entries become eligible
//! only at or after their scheduled time; a higher-priority entry may jump
//! ahead of a lower-priority one it would otherwise overlap or be forced to
//! wait behind; and no two entries' transmission windows overlap in the
//! final ordering. See the module tests for the worked examples this logic
//! is built against.

use crate::config::BusTiming;
use crate::frame::Frame;

/// A scheduled frame and its timing/priority parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    pub id: u32,
    /// Lower numeric value means more important. 0 is highest priority.
    pub priority: u8,
    pub next_tx_time_us: u64,
    pub frame: Frame,
    pub expect_response: bool,
    pub expected_response_words: u8,
    /// 0 means one-shot; otherwise the re-arm period after a successful pop.
    pub auto_repeat_us: u64,
    pub read_timeout_us: u64,
}

impl Transmission {
    /// Estimated time this transmission occupies the wire: the line
    /// engine's write-deadline formula applied to the outbound frame, plus
    /// the same formula applied to the expected response length when a
    /// response is expected — without the write deadline's timeout
    /// inflation, since this estimates actual duration rather than a
    /// worst-case deadline.
    pub fn duration_us(&self, timing: &BusTiming) -> u64 {
        let write_us = bit_time_us(self.frame.length_words(), timing);
        if self.expect_response {
            write_us + bit_time_us(self.expected_response_words, timing)
        } else {
            write_us
        }
    }
}

fn bit_time_us(payload_words: u8, timing: &BusTiming) -> u64 {
    let bits = (u32::from(payload_words) * 4 + 5) * 8;
    let mut ns = u64::from(bits) * (u64::from(timing.min_clock_period_ns) * 3 / 2);
    ns += 20 * u64::from(timing.min_clock_period_ns);
    ns / 1000
}

/// An insertion-sorted, unbounded list of pending transmissions.
pub struct TransmissionScheduler {
    entries: Vec<Transmission>,
    next_id: u32,
    timing: BusTiming,
}

impl TransmissionScheduler {
    pub fn new(timing: BusTiming) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            timing,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending transmissions in scheduled order (head first). Exposed for
    /// tests and diagnostics; callers should prefer `pop_next`.
    pub fn schedule(&self) -> &[Transmission] {
        &self.entries
    }

    /// The duration a transmission with these parameters would occupy the
    /// wire, per [`Transmission::duration_us`].
    pub fn estimate_duration_us(&self, frame: &Frame, expect_response: bool, expected_response_words: u8) -> u64 {
        let probe = Transmission {
            id: 0,
            priority: 0,
            next_tx_time_us: 0,
            frame: frame.clone(),
            expect_response,
            expected_response_words,
            auto_repeat_us: 0,
            read_timeout_us: 0,
        };
        probe.duration_us(&self.timing)
    }

    /// Adds a new transmission and returns its freshly assigned id.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        priority: u8,
        next_tx_time_us: u64,
        frame: Frame,
        expect_response: bool,
        expected_response_words: u8,
        auto_repeat_us: u64,
        read_timeout_us: u64,
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let transmission = Transmission {
            id,
            priority,
            next_tx_time_us,
            frame,
            expect_response,
            expected_response_words,
            auto_repeat_us,
            read_timeout_us,
        };
        self.insert(transmission);
        id
    }

    fn insert(&mut self, transmission: Transmission) {
        let pos = self
            .entries
            .iter()
            .position(|e| e.next_tx_time_us > transmission.next_tx_time_us)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, transmission);
        self.stabilize();
    }

    /// Repeatedly bubbles a higher-priority entry ahead of a neighbor it
    /// would otherwise overlap, until a full pass makes no further swaps.
    fn stabilize(&mut self) {
        loop {
            let effective_starts = self.effective_starts();
            let mut swapped = false;
            for i in 0..self.entries.len().saturating_sub(1) {
                let (a, b) = (&self.entries[i], &self.entries[i + 1]);
                if b.priority < a.priority {
                    let a_end = effective_starts[i] + a.duration_us(&self.timing);
                    if b.next_tx_time_us < a_end {
                        self.entries.swap(i, i + 1);
                        swapped = true;
                        break;
                    }
                }
            }
            if !swapped {
                break;
            }
        }
    }

    /// Sweeps the current order left to right, delaying each entry's start
    /// to no earlier than the previous entry's window end.
    fn effective_starts(&self) -> Vec<u64> {
        let mut starts = Vec::with_capacity(self.entries.len());
        let mut prev_end: Option<u64> = None;
        for e in &self.entries {
            let start = match prev_end {
                Some(end) => e.next_tx_time_us.max(end),
                None => e.next_tx_time_us,
            };
            starts.push(start);
            prev_end = Some(start + e.duration_us(&self.timing));
        }
        starts
    }

    /// Removes and returns the head transmission if it is due by `now_us`.
    /// A repeating transmission is re-armed at `next_tx_time_us + k * period`
    /// for the smallest `k` that lands strictly after `now_us`.
    pub fn pop_next(&mut self, now_us: u64) -> Option<Transmission> {
        if self.entries.first()?.next_tx_time_us > now_us {
            return None;
        }
        let item = self.entries.remove(0);

        if item.auto_repeat_us > 0 {
            let period = item.auto_repeat_us;
            let sched = item.next_tx_time_us;
            let k = if now_us >= sched { (now_us - sched) / period + 1 } else { 1 };
            let mut next = item.clone();
            next.next_tx_time_us = sched + k * period;
            self.insert(next);
        }

        Some(item)
    }

    /// Removes the transmission with `id`, if any. Returns the count removed (0 or 1).
    pub fn cancel_by_id(&mut self, id: u32) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        before - self.entries.len()
    }

    /// Removes every transmission addressed to `recipient`.
    pub fn cancel_by_recipient(&mut self, recipient: u8) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.frame.recipient != recipient);
        before - self.entries.len()
    }

    /// Removes every pending transmission.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }
}
