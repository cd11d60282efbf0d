//! Zero-cross synchronised relay engine.
//!
//! ```text
//!   relay task                timer context              zero-cross ISR
//!  ────────────              ───────────────            ────────────────
//!   intake ──upsert──▶ ┌──────────────────┐ ◀──execute── edge scheduler
//!   dispatch ◀─take─── │   ActionSlots    │                  │
//!                      └──────────────────┘                  │ arm
//!                              ▲ request_if_free             ▼
//!                      timeout monitor ◀────────────── TimeoutMonitor
//!                      edge watchdog ──fail_all_pending──▶ (flush)
//!
//!           all three contexts raise EngineSignal into SignalQueue
//! ```
//!
//! The engine owns every piece of shared state and is `Sync`: it lives in a
//! `static` on target and is shared by reference between the ISR, the
//! periodic timer and the relay task.  Nothing in here locks.
//!
//! Which context may call what:
//!
//! | Method                         | Context            |
//! |--------------------------------|--------------------|
//! | [`RelayEngine::on_zero_cross`] | zero-cross ISR     |
//! | [`RelayEngine::on_timer_tick`] | periodic timer     |
//! | `submit`, `arm_if_idle`, ...   | relay task only    |

pub mod actuator;
pub mod edge;
pub mod registry;
pub mod slots;
pub mod timeout;
pub mod watchdog;

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use crate::app::ports::{EdgeSet, ZeroCrossPort};
use crate::config::SystemConfig;
use crate::error::{ActuatorError, Error, RequestError};
use crate::events::{EngineSignal, SignalQueue};

use self::actuator::{Actuator, ActuatorId, RelayAction, RelayState};
use self::edge::EdgeScheduler;
use self::registry::{ActuatorRef, Registry};
use self::slots::{ActionSlots, SlotStatus};
use self::timeout::TimeoutMonitor;
use self::watchdog::EdgeWatchdog;

// ---------------------------------------------------------------------------
// Failure cause
// ---------------------------------------------------------------------------

/// Why a queued action ended in `Failed`.  Stored per slot next to the
/// `Failed` tag so the relay task can report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FailureCause {
    GpioWriteFailed = 0,
    UnmappedOutput = 1,
    NoLowOutput = 2,
    /// Flushed by the edge watchdog.
    ZeroCrossLost = 3,
}

impl FailureCause {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::GpioWriteFailed,
            1 => Self::UnmappedOutput,
            2 => Self::NoLowOutput,
            _ => Self::ZeroCrossLost,
        }
    }
}

impl From<ActuatorError> for FailureCause {
    fn from(e: ActuatorError) -> Self {
        match e {
            ActuatorError::GpioWriteFailed(_) => Self::GpioWriteFailed,
            ActuatorError::UnmappedOutput(_) => Self::UnmappedOutput,
            ActuatorError::NoLowOutput => Self::NoLowOutput,
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters and reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    pub edges: EdgeSet,
    pub sync_delay_us: u32,
    pub max_sync_delay_us: u32,
    pub watchdog_window_ms: u32,
}

impl From<&SystemConfig> for EngineParams {
    fn from(c: &SystemConfig) -> Self {
        Self {
            edges: c.zero_cross_edges,
            sync_delay_us: c.sync_delay_us,
            max_sync_delay_us: c.max_sync_delay_us,
            watchdog_window_ms: c.watchdog_window_ms(),
        }
    }
}

impl Default for EngineParams {
    fn default() -> Self {
        Self::from(&SystemConfig::default())
    }
}

/// What one timer tick did.  The timer context cannot log, so the relay
/// task logs from the signals this produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Relays whose high-current time ran out and got a `TurnOnLow` queued.
    pub step_downs: usize,
    /// Pending actions failed by the edge watchdog.
    pub flushed: usize,
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub edges: u32,
    pub actions: u32,
    pub failures: u32,
    pub step_downs: u32,
    pub watchdog_flushes: u32,
    pub spurious_edges: u32,
    pub dropped_signals: u32,
}

#[derive(Default)]
struct Counters {
    edges: AtomicU32,
    actions: AtomicU32,
    failures: AtomicU32,
    step_downs: AtomicU32,
    watchdog_flushes: AtomicU32,
    spurious_edges: AtomicU32,
}

fn bump(counter: &AtomicU32) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// No sync-delay change waiting to be latched.
const NO_DELAY_REQUEST: u32 = u32::MAX;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct RelayEngine<const N: usize> {
    registry: Registry<N>,
    pub(crate) slots: ActionSlots<N>,
    causes: [AtomicU8; N],
    timeouts: TimeoutMonitor<N>,
    edge: EdgeScheduler,
    watchdog: EdgeWatchdog,
    signals: SignalQueue,
    params: EngineParams,
    requested_delay_us: AtomicU32,
    counters: Counters,
}

impl<const N: usize> RelayEngine<N> {
    /// Freeze `registry` and build the engine around it.  The zero-cross
    /// source starts disarmed.
    pub fn new(registry: Registry<N>, params: EngineParams) -> Self {
        Self {
            registry,
            slots: ActionSlots::new(),
            causes: core::array::from_fn(|_| AtomicU8::new(FailureCause::GpioWriteFailed as u8)),
            timeouts: TimeoutMonitor::new(),
            edge: EdgeScheduler::new(params.sync_delay_us),
            watchdog: EdgeWatchdog::new(params.watchdog_window_ms),
            signals: SignalQueue::new(),
            params,
            requested_delay_us: AtomicU32::new(NO_DELAY_REQUEST),
            counters: Counters::default(),
        }
    }

    /// Validate `config`, register its relay table and build the engine.
    pub fn from_config(config: &SystemConfig) -> Result<Self, Error> {
        config.validate()?;
        let mut registry = Registry::new();
        for def in &config.relays {
            registry.register(def)?;
        }
        Ok(Self::new(registry, EngineParams::from(config)))
    }

    // ── Queries (any context) ─────────────────────────────────

    pub fn registry(&self) -> &Registry<N> {
        &self.registry
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn signals(&self) -> &SignalQueue {
        &self.signals
    }

    pub fn state_of(&self, id: ActuatorId) -> Option<RelayState> {
        self.registry.find(id).map(|r| self.registry.get(r).state())
    }

    pub fn slot_status(&self, id: ActuatorId) -> Option<SlotStatus> {
        self.registry.find(id).map(|r| self.slots.status(r.index()))
    }

    /// Whether the zero-cross interrupt is currently armed.
    pub fn edges_enabled(&self) -> bool {
        self.edge.is_enabled()
    }

    /// Sync delay the edge scheduler is using right now.
    pub fn active_sync_delay_us(&self) -> u32 {
        self.edge.sync_delay_us()
    }

    /// A requested sync delay not yet latched, if any.
    pub fn requested_sync_delay_us(&self) -> Option<u32> {
        match self.requested_delay_us.load(Ordering::Acquire) {
            NO_DELAY_REQUEST => None,
            us => Some(us),
        }
    }

    pub fn high_timeout_armed(&self, id: ActuatorId) -> bool {
        self.registry
            .find(id)
            .is_some_and(|r| self.timeouts.is_armed(r.index()))
    }

    pub fn stats(&self) -> EngineStats {
        let c = &self.counters;
        EngineStats {
            edges: c.edges.load(Ordering::Relaxed),
            actions: c.actions.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            step_downs: c.step_downs.load(Ordering::Relaxed),
            watchdog_flushes: c.watchdog_flushes.load(Ordering::Relaxed),
            spurious_edges: c.spurious_edges.load(Ordering::Relaxed),
            dropped_signals: self.signals.dropped_total(),
        }
    }

    // ── Relay task ────────────────────────────────────────────

    /// Queue `action` for relay `id`, replacing whatever was pending.
    ///
    /// Returns the handle and what the slot held before; a `Completed` or
    /// `Failed` previous status is an outcome the dispatcher has not
    /// reported yet.
    pub(crate) fn submit(
        &self,
        id: ActuatorId,
        action: RelayAction,
    ) -> Result<(ActuatorRef, SlotStatus), RequestError> {
        let r = self.registry.find(id).ok_or(RequestError::UnknownActuator(id))?;
        if !self.registry.get(r).supports(action) {
            return Err(RequestError::UnsupportedAction { id, action });
        }
        let prev = self.slots.upsert(r.index(), action);
        self.signals.raise(EngineSignal::WorkAvailable);
        Ok((r, prev))
    }

    /// Record a sync-delay change.  It takes effect the next time the
    /// zero-cross source is armed, never in the middle of a batch.
    pub(crate) fn request_sync_delay(&self, delay_us: u32) -> Result<(), RequestError> {
        if delay_us > self.params.max_sync_delay_us {
            return Err(RequestError::SyncDelayOutOfRange(delay_us));
        }
        self.requested_delay_us.store(delay_us, Ordering::Release);
        self.signals.raise(EngineSignal::SyncDelayRequested);
        Ok(())
    }

    /// Apply a requested sync delay if the edge scheduler is idle.
    /// Returns the newly active delay.
    pub(crate) fn latch_sync_delay(&self) -> Option<u32> {
        if self.edge.is_enabled() {
            return None;
        }
        match self.requested_delay_us.swap(NO_DELAY_REQUEST, Ordering::AcqRel) {
            NO_DELAY_REQUEST => None,
            us => {
                self.edge.set_sync_delay_us(us);
                Some(us)
            }
        }
    }

    /// Arm the zero-cross source if it is idle and work is pending.
    ///
    /// The resume pointer is primed with the first pending slot so the
    /// first edge after arming already executes an action.
    pub(crate) fn arm_if_idle<Z: ZeroCrossPort>(&self, zc: &mut Z, now_ms: u32) -> bool {
        if self.edge.is_enabled() {
            return false;
        }
        let Some(first) = self.slots.next_pending(0) else {
            return false;
        };
        self.latch_sync_delay();
        self.watchdog.note_activity(now_ms);
        self.edge.arm(zc, self.params.edges, first);
        true
    }

    /// Disarm the zero-cross source unconditionally.
    pub(crate) fn disarm<Z: ZeroCrossPort>(&self, zc: &mut Z) {
        self.edge.disarm(zc, self.params.edges);
    }

    pub(crate) fn any_pending(&self) -> bool {
        self.slots.any_pending()
    }

    /// Reset a finished slot and return its outcome, with the failure
    /// cause for `Failed` slots.
    pub(crate) fn take_finished(&self, r: ActuatorRef) -> Option<(SlotStatus, FailureCause)> {
        let idx = r.index();
        self.slots
            .take_finished(idx)
            .map(|status| (status, self.cause(idx)))
    }

    pub(crate) fn cause(&self, idx: usize) -> FailureCause {
        FailureCause::from_u8(self.causes[idx].load(Ordering::Acquire))
    }

    pub(crate) fn actuator(&self, r: ActuatorRef) -> &Actuator {
        self.registry.get(r)
    }

    // ── Timer context ─────────────────────────────────────────

    /// Periodic tick: edge watchdog first, then high-current timeouts.
    ///
    /// A timeout only queues `TurnOnLow`; the step-down itself happens on a
    /// later zero-cross edge.  If the slot is busy the timeout stays armed
    /// and is retried on the next tick.  Never logs.
    pub fn on_timer_tick<Z: ZeroCrossPort>(&self, zc: &mut Z, now_ms: u32) -> TickReport {
        let mut report = TickReport::default();

        if self.edge.is_enabled() && self.watchdog.starved(now_ms) {
            self.edge.disarm(zc, self.params.edges);
            report.flushed = self.slots.fail_all_pending(|idx| {
                self.causes[idx].store(FailureCause::ZeroCrossLost as u8, Ordering::Release);
            });
            self.counters
                .failures
                .fetch_add(report.flushed as u32, Ordering::Relaxed);
            bump(&self.counters.watchdog_flushes);
            self.signals.raise(EngineSignal::BatchComplete);
        }

        for idx in self.timeouts.expired_slots(now_ms) {
            if self.registry.by_index(idx).state() != RelayState::OnHigh {
                self.timeouts.disarm(idx);
                continue;
            }
            if self.slots.request_if_free(idx, RelayAction::TurnOnLow) {
                self.timeouts.disarm(idx);
                bump(&self.counters.step_downs);
                report.step_downs += 1;
            }
        }
        if report.step_downs > 0 {
            self.signals.raise(EngineSignal::WorkAvailable);
        }

        report
    }
}
