//! Edge watchdog: detects a zero-cross input that went silent while armed.
//!
//! The edge scheduler stamps every serviced edge; the timer context checks
//! the stamp.  If no edge has arrived for longer than the window while
//! work is pending, the engine disarms the source and fails every pending
//! action instead of leaving it queued forever.

use core::sync::atomic::{AtomicU32, Ordering};

pub struct EdgeWatchdog {
    window_ms: u32,
    last_activity_ms: AtomicU32,
}

impl EdgeWatchdog {
    pub const fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            last_activity_ms: AtomicU32::new(0),
        }
    }

    /// Called on each edge and when the source is armed.
    pub fn note_activity(&self, now_ms: u32) {
        self.last_activity_ms.store(now_ms, Ordering::Release);
    }

    pub fn starved(&self, now_ms: u32) -> bool {
        let last = self.last_activity_ms.load(Ordering::Acquire);
        now_ms.wrapping_sub(last) > self.window_ms
    }
}
