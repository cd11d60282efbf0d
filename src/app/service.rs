//! Relay service: the relay task's side of the engine.
//!
//! [`RelayService`] runs in the background relay task.  It validates and
//! queues inbound requests, arms the zero-cross source when work appears,
//! and turns finished slots into [`RelayEvent`]s.  It never drives an
//! output itself: every state change happens in the edge scheduler.
//!
//! ```text
//!   bus ──▶ handle_message ──▶ submit ──▶ ┌──────────────┐
//!                                         │ RelayEngine  │ ◀── ISR / timer
//!   StatusSink ◀── dispatch ◀── poll ◀──  │  (signals)   │
//!                                         └──────────────┘
//! ```
//!
//! All I/O flows through port traits passed in at call sites, so the whole
//! service runs on the host against mocks.

use log::{debug, info, warn};

use crate::error::RequestError;
use crate::events::EngineSignal;
use crate::relay::actuator::{ActuatorId, RelayAction};
use crate::relay::registry::ActuatorRef;
use crate::relay::slots::SlotStatus;
use crate::relay::{FailureCause, RelayEngine};

use super::commands::RelayCommand;
use super::events::RelayEvent;
use super::ports::{StatusSink, ZeroCrossPort};

/// Task-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub accepted: u32,
    pub rejected: u32,
    pub published: u32,
    pub publish_failures: u32,
    /// Full sweeps run after the signal channel overflowed.
    pub sweeps: u32,
}

pub struct RelayService<'e, const N: usize> {
    engine: &'e RelayEngine<N>,
    stats: ServiceStats,
}

impl<'e, const N: usize> RelayService<'e, N> {
    pub fn new(engine: &'e RelayEngine<N>) -> Self {
        Self {
            engine,
            stats: ServiceStats::default(),
        }
    }

    pub fn engine(&self) -> &'e RelayEngine<N> {
        self.engine
    }

    pub fn stats(&self) -> ServiceStats {
        self.stats
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Put the zero-cross source in its idle (disarmed) state.
    pub fn start(&mut self, zc: &mut impl ZeroCrossPort) {
        self.engine.disarm(zc);
        info!(
            "RelayService started: {} relays, sync delay {}us, {:?} edges",
            self.engine.registry().len(),
            self.engine.active_sync_delay_us(),
            self.engine.params().edges
        );
    }

    // ── Command intake ────────────────────────────────────────

    /// Queue `action` for relay `id`.  Last write wins: an earlier request
    /// that has not reached an edge yet is replaced.
    pub fn request(
        &mut self,
        id: ActuatorId,
        action: RelayAction,
        sink: &mut impl StatusSink,
    ) -> Result<(), RequestError> {
        match self.engine.submit(id, action) {
            Ok((r, prev)) => {
                self.stats.accepted += 1;
                debug!("relay {id}: queued {action:?} (was {prev:?})");
                // The overwritten slot held an outcome nobody has reported.
                if prev.is_finished() {
                    self.emit_outcome(r, prev, self.engine.cause(r.index()), sink);
                }
                Ok(())
            }
            Err(e) => self.reject(e),
        }
    }

    /// Request a new sync delay.  Applied when the edge source is next idle.
    pub fn set_sync_delay(&mut self, delay_us: u32) -> Result<(), RequestError> {
        match self.engine.request_sync_delay(delay_us) {
            Ok(()) => {
                self.stats.accepted += 1;
                info!("sync delay {delay_us}us requested");
                Ok(())
            }
            Err(e) => self.reject(e),
        }
    }

    pub fn handle_command(
        &mut self,
        cmd: RelayCommand,
        sink: &mut impl StatusSink,
    ) -> Result<(), RequestError> {
        match cmd {
            RelayCommand::Switch { id, action } => self.request(id, action, sink),
            RelayCommand::SetSyncDelay { delay_us } => self.set_sync_delay(delay_us),
        }
    }

    /// Decode and handle one bus message.
    pub fn handle_message(
        &mut self,
        topic: &str,
        payload: &[u8],
        sink: &mut impl StatusSink,
    ) -> Result<(), RequestError> {
        match RelayCommand::decode(topic, payload) {
            Ok(cmd) => self.handle_command(cmd, sink),
            Err(e) => {
                debug!("{topic}: {} byte payload did not decode", payload.len());
                self.reject(e)
            }
        }
    }

    // ── Signal dispatch ───────────────────────────────────────

    /// Handle every queued engine signal.  Returns how many were handled.
    ///
    /// If the signal channel overflowed since the last poll, a full sweep
    /// (dispatch, latch, re-arm) runs afterwards so no lost signal can
    /// strand work.
    pub fn poll(
        &mut self,
        now_ms: u32,
        zc: &mut impl ZeroCrossPort,
        sink: &mut impl StatusSink,
    ) -> usize {
        let dropped = self.engine.signals().take_dropped();
        let mut handled = 0;

        while let Some(signal) = self.engine.signals().try_next() {
            handled += 1;
            match signal {
                EngineSignal::WorkAvailable => self.arm(zc, now_ms),
                EngineSignal::ActionCompleted => self.dispatch_finished(sink),
                EngineSignal::BatchComplete => {
                    self.dispatch_finished(sink);
                    self.latch_sync_delay();
                    // A request may have landed while the ISR finished its scan.
                    self.arm(zc, now_ms);
                }
                EngineSignal::SyncDelayRequested => {
                    if !self.latch_sync_delay() && self.engine.edges_enabled() {
                        debug!("sync delay change deferred until the batch completes");
                    }
                }
            }
        }

        if dropped > 0 {
            warn!("{dropped} engine signals dropped, running full sweep");
            self.stats.sweeps += 1;
            self.dispatch_finished(sink);
            self.latch_sync_delay();
            self.arm(zc, now_ms);
        }

        handled
    }

    // ── Internal ──────────────────────────────────────────────

    fn reject(&mut self, e: RequestError) -> Result<(), RequestError> {
        self.stats.rejected += 1;
        warn!("request rejected: {e}");
        Err(e)
    }

    fn arm(&mut self, zc: &mut impl ZeroCrossPort, now_ms: u32) {
        if self.engine.arm_if_idle(zc, now_ms) {
            debug!(
                "zero-cross armed, sync delay {}us",
                self.engine.active_sync_delay_us()
            );
        }
    }

    fn latch_sync_delay(&mut self) -> bool {
        match self.engine.latch_sync_delay() {
            Some(us) => {
                info!("sync delay now {us}us");
                true
            }
            None => false,
        }
    }

    fn dispatch_finished(&mut self, sink: &mut impl StatusSink) {
        let engine = self.engine;
        for idx in 0..engine.registry().len() {
            let r = ActuatorRef(idx);
            if let Some((status, cause)) = engine.take_finished(r) {
                self.emit_outcome(r, status, cause, sink);
            }
        }
    }

    fn emit_outcome(
        &mut self,
        r: ActuatorRef,
        status: SlotStatus,
        cause: FailureCause,
        sink: &mut impl StatusSink,
    ) {
        let actuator = self.engine.actuator(r);
        let id = actuator.id();
        let event = match status {
            SlotStatus::Completed(action) => {
                debug!("relay {id}: {action:?} applied");
                RelayEvent::StateChanged {
                    id,
                    state: action.target_state(),
                }
            }
            SlotStatus::Failed(action) => {
                let state = actuator.state();
                warn!("relay {id}: {action:?} failed ({cause:?}), still {state:?}");
                RelayEvent::ActuationFailed {
                    id,
                    action,
                    state,
                    cause,
                }
            }
            SlotStatus::Idle | SlotStatus::Pending(_) => return,
        };
        self.publish(&event, sink);
    }

    fn publish(&mut self, event: &RelayEvent, sink: &mut impl StatusSink) {
        match sink.publish(event) {
            Ok(()) => self.stats.published += 1,
            Err(e) => {
                self.stats.publish_failures += 1;
                warn!("relay {}: status not published: {e}", event.id());
            }
        }
    }
}
