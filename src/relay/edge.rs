//! Edge scheduler: runs on every zero-cross interrupt.
//!
//! Executes at most one pending action per edge, staggering simultaneous
//! requests across consecutive half-cycles so that inrush currents never
//! add up.  A resume pointer carries the scan position from one edge to
//! the next.
//!
//! ```text
//!  edge n:   [execute resume slot] ──▶ scan for next pending ──▶ resume = next
//!  edge n+1: [execute resume slot] ──▶ scan ... none left ──▶ disarm + BatchComplete
//! ```
//!
//! Interrupt context rules: no logging, no allocation, no blocking other
//! than the configured sync delay.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use embedded_hal::delay::DelayNs;

use super::actuator::{ActuatorId, RelayAction, RelayState};
use super::slots::SlotStatus;
use super::{FailureCause, RelayEngine, bump};
use crate::app::ports::{ActuationPort, EdgeSet, ZeroCrossPort};
use crate::error::ActuatorError;
use crate::events::EngineSignal;

const NO_RESUME: usize = usize::MAX;

/// Edge-side state: resume pointer, armed flag and the latched sync delay.
pub struct EdgeScheduler {
    resume: AtomicUsize,
    enabled: AtomicBool,
    sync_delay_us: AtomicU32,
}

impl EdgeScheduler {
    pub(crate) const fn new(sync_delay_us: u32) -> Self {
        Self {
            resume: AtomicUsize::new(NO_RESUME),
            enabled: AtomicBool::new(false),
            sync_delay_us: AtomicU32::new(sync_delay_us),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn sync_delay_us(&self) -> u32 {
        self.sync_delay_us.load(Ordering::Relaxed)
    }

    pub(crate) fn set_sync_delay_us(&self, us: u32) {
        self.sync_delay_us.store(us, Ordering::Relaxed);
    }

    /// Prime the resume pointer, then enable the interrupt.  The flag is
    /// published before the hardware is armed so the first edge sees it.
    pub(crate) fn arm<Z: ZeroCrossPort>(&self, zc: &mut Z, edges: EdgeSet, first: usize) {
        self.resume.store(first, Ordering::Relaxed);
        self.enabled.store(true, Ordering::Release);
        zc.enable(edges);
    }

    pub(crate) fn disarm<Z: ZeroCrossPort>(&self, zc: &mut Z, edges: EdgeSet) {
        zc.disable(edges);
        self.resume.store(NO_RESUME, Ordering::Relaxed);
        self.enabled.store(false, Ordering::Release);
    }

    fn take_resume(&self) -> Option<usize> {
        match self.resume.swap(NO_RESUME, Ordering::AcqRel) {
            NO_RESUME => None,
            idx => Some(idx),
        }
    }

    fn set_resume(&self, idx: usize) {
        self.resume.store(idx, Ordering::Release);
    }
}

/// One action applied on an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    pub id: ActuatorId,
    pub action: RelayAction,
    pub outcome: Result<RelayState, ActuatorError>,
}

/// What a single edge did.  Returned for tests and diagnostics; the ISR
/// glue on target ignores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeReport {
    pub executed: Option<Execution>,
    /// Relay the next edge will service.
    pub next: Option<ActuatorId>,
    /// The queue was empty after this edge and the source was disarmed.
    pub drained: bool,
}

impl<const N: usize> RelayEngine<N> {
    /// Zero-cross interrupt handler.
    ///
    /// 1. If the resume slot holds a pending action, wait the sync delay and
    ///    apply it.
    /// 2. Scan forward (wrapping) for the next pending slot and park the
    ///    resume pointer there.
    /// 3. If nothing is pending, disarm the edge source and raise
    ///    `BatchComplete`.
    ///
    /// An edge that arrives while the engine is disarmed is counted and
    /// otherwise ignored.
    pub fn on_zero_cross<H>(&self, hw: &mut H, now_ms: u32) -> EdgeReport
    where
        H: ActuationPort + ZeroCrossPort + DelayNs,
    {
        if !self.edge.is_enabled() {
            bump(&self.counters.spurious_edges);
            return EdgeReport::default();
        }
        bump(&self.counters.edges);
        self.watchdog.note_activity(now_ms);

        let mut report = EdgeReport::default();
        let resume = self.edge.take_resume();

        if let Some(idx) = resume {
            if let SlotStatus::Pending(action) = self.slots.status(idx) {
                let delay = self.edge.sync_delay_us();
                if delay > 0 {
                    hw.delay_us(delay);
                }
                report.executed = Some(self.execute(idx, action, hw, now_ms));
            }
        }

        match self.slots.next_pending_after(resume) {
            Some(next) => {
                self.edge.set_resume(next);
                report.next = Some(self.registry.by_index(next).id());
            }
            None => {
                self.edge.disarm(hw, self.params.edges);
                report.drained = true;
                self.signals.raise(EngineSignal::BatchComplete);
            }
        }
        report
    }

    fn execute<P: ActuationPort>(
        &self,
        idx: usize,
        action: RelayAction,
        hw: &mut P,
        now_ms: u32,
    ) -> Execution {
        let actuator = self.registry.by_index(idx);
        let outcome = actuator.drive(action, hw);

        match outcome {
            Ok(state) => {
                actuator.set_state(state);
                if state == RelayState::OnHigh && actuator.max_high_ms() > 0 {
                    self.timeouts.arm(idx, now_ms, actuator.max_high_ms());
                } else {
                    self.timeouts.disarm(idx);
                }
                // A request that landed mid-drive keeps the slot pending.
                self.slots.complete(idx, action);
                bump(&self.counters.actions);
            }
            Err(fault) => {
                actuator.set_state(fault.state);
                if fault.state != RelayState::OnHigh {
                    self.timeouts.disarm(idx);
                } else if actuator.max_high_ms() > 0 && !self.timeouts.is_armed(idx) {
                    self.timeouts.arm(idx, now_ms, actuator.max_high_ms());
                }
                self.causes[idx].store(FailureCause::from(fault.error) as u8, Ordering::Release);
                self.slots.fail(idx, action);
                bump(&self.counters.failures);
            }
        }
        self.signals.raise(EngineSignal::ActionCompleted);

        Execution {
            id: actuator.id(),
            action,
            outcome: outcome.map_err(|fault| fault.error),
        }
    }
}
