//! Engine signals between execution contexts.
//!
//! Signals are produced by:
//! - the zero-cross ISR (an action completed, the batch drained)
//! - the timer context (a step-down was queued, the watchdog flushed)
//! - command intake in the relay task (work queued, sync delay requested)
//!
//! and consumed by the relay task, one at a time, in [`RelayService::poll`].
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ Zero-cross   │────▶│               │     │              │
//! │ Timer tick   │────▶│  SignalQueue  │────▶│  Relay task  │
//! │ Intake       │────▶│ (bounded,ISR) │     │  (consumer)  │
//! └──────────────┘     └───────────────┘     └──────────────┘
//! ```
//!
//! Signals are wake hints: the slot array is the source of truth.  If the
//! channel is ever full the signal is dropped and counted, and the next
//! poll does a full sweep instead of trusting the signal stream.
//!
//! [`RelayService::poll`]: crate::app::service::RelayService::poll

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Channel depth.  Covers one completion per edge plus intake bursts for
/// the relay counts this firmware is built for.
const SIGNAL_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSignal {
    /// A request was queued; arm the zero-cross source if it is idle.
    WorkAvailable,
    /// The edge scheduler finished (or failed) one action.
    ActionCompleted,
    /// The edge scheduler found no more pending work and disarmed.
    BatchComplete,
    /// A new sync delay was requested.
    SyncDelayRequested,
}

pub struct SignalQueue {
    channel: Channel<CriticalSectionRawMutex, EngineSignal, SIGNAL_DEPTH>,
    dropped: AtomicU32,
    dropped_total: AtomicU32,
}

impl Default for SignalQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
            dropped_total: AtomicU32::new(0),
        }
    }

    /// Push a signal.  Safe to call from interrupt context.
    /// Returns `false` if the queue was full (signal dropped and counted).
    pub fn raise(&self, signal: EngineSignal) -> bool {
        if self.channel.try_send(signal).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.dropped_total.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Pop the next signal, if any.
    pub fn try_next(&self) -> Option<EngineSignal> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending signals into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(EngineSignal)) {
        while let Some(signal) = self.try_next() {
            handler(signal);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Dropped-signal count since the last call; resets it to zero.
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::AcqRel)
    }

    /// Signals dropped since boot.
    pub fn dropped_total(&self) -> u32 {
        self.dropped_total.load(Ordering::Relaxed)
    }
}
