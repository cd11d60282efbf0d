//! High-current timeout monitor.
//!
//! One deadline per relay, armed by the edge scheduler when a `TurnOnHigh`
//! completes and polled from the periodic timer context.  Deadlines are
//! `u32` milliseconds compared with wrapping arithmetic, so the monitor
//! survives the 49-day wrap of the millisecond counter.
//!
//! Expiry does not switch anything by itself: the engine turns it into a
//! `TurnOnLow` request that goes through the same zero-cross path as every
//! other action.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub struct TimeoutMonitor<const N: usize> {
    deadlines: [AtomicU32; N],
    armed: [AtomicBool; N],
}

impl<const N: usize> Default for TimeoutMonitor<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TimeoutMonitor<N> {
    pub fn new() -> Self {
        Self {
            deadlines: core::array::from_fn(|_| AtomicU32::new(0)),
            armed: core::array::from_fn(|_| AtomicBool::new(false)),
        }
    }

    pub fn arm(&self, idx: usize, now_ms: u32, duration_ms: u32) {
        self.deadlines[idx].store(now_ms.wrapping_add(duration_ms), Ordering::Relaxed);
        self.armed[idx].store(true, Ordering::Release);
    }

    pub fn disarm(&self, idx: usize) {
        self.armed[idx].store(false, Ordering::Release);
    }

    pub fn is_armed(&self, idx: usize) -> bool {
        self.armed[idx].load(Ordering::Acquire)
    }

    pub fn expired(&self, idx: usize, now_ms: u32) -> bool {
        if !self.is_armed(idx) {
            return false;
        }
        let deadline = self.deadlines[idx].load(Ordering::Relaxed);
        // Signed distance handles counter wrap.
        now_ms.wrapping_sub(deadline) as i32 >= 0
    }

    /// Slots whose deadline has passed, in slot order.
    pub fn expired_slots(&self, now_ms: u32) -> impl Iterator<Item = usize> + '_ {
        (0..N).filter(move |&i| self.expired(i, now_ms))
    }
}
