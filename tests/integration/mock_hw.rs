//! Mock hardware and a half-cycle bench for integration tests.
//!
//! [`MockHw`] records every output write, zero-cross arm/disarm and sync
//! delay so tests can assert on the full history without real GPIO.
//! [`Bench`] advances simulated mains time: one call to
//! [`Bench::half_cycle`] is one zero-cross edge (delivered only while the
//! input is armed), the timer ticks that fall inside it, and one relay
//! task poll.

use std::collections::{HashMap, HashSet};

use embedded_hal::delay::DelayNs;

use zcrelay::app::events::RelayEvent;
use zcrelay::app::ports::{ActuationPort, EdgeSet, StatusSink, ZeroCrossPort};
use zcrelay::app::service::RelayService;
use zcrelay::error::{ActuatorError, PublishError};
use zcrelay::relay::actuator::{OutputId, RelayDefinition};
use zcrelay::relay::edge::EdgeReport;
use zcrelay::relay::registry::Registry;
use zcrelay::relay::{EngineParams, RelayEngine};

pub const CAP: usize = 8;
pub const HALF_CYCLE_MS: u32 = 10;
pub const TICK_MS: u32 = 5;

// ── MockHw ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockHw {
    pub levels: HashMap<OutputId, bool>,
    pub writes: Vec<(OutputId, bool)>,
    pub zc_enabled: bool,
    pub enables: u32,
    pub disables: u32,
    pub delays_us: Vec<u32>,
    pub broken: HashSet<OutputId>,
}

#[allow(dead_code)]
impl MockHw {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, output: OutputId) -> bool {
        self.levels.get(&output).copied().unwrap_or(false)
    }

    pub fn break_output(&mut self, output: OutputId) {
        self.broken.insert(output);
    }
}

impl ActuationPort for MockHw {
    fn drive(&mut self, output: OutputId, level: bool) -> Result<(), ActuatorError> {
        if self.broken.contains(&output) {
            return Err(ActuatorError::GpioWriteFailed(output));
        }
        self.levels.insert(output, level);
        self.writes.push((output, level));
        Ok(())
    }

    fn read_state(&mut self, output: OutputId) -> Option<bool> {
        self.levels.get(&output).copied()
    }
}

impl ZeroCrossPort for MockHw {
    fn enable(&mut self, _edges: EdgeSet) {
        self.zc_enabled = true;
        self.enables += 1;
    }

    fn disable(&mut self, _edges: EdgeSet) {
        self.zc_enabled = false;
        self.disables += 1;
    }
}

impl DelayNs for MockHw {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_us(&mut self, us: u32) {
        self.delays_us.push(us);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<RelayEvent>,
    pub refuse: bool,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_relay(&self, id: u32) -> Vec<RelayEvent> {
        self.events.iter().copied().filter(|e| e.id() == id).collect()
    }
}

impl StatusSink for RecordingSink {
    fn publish(&mut self, event: &RelayEvent) -> Result<(), PublishError> {
        if self.refuse {
            return Err(PublishError::Disconnected);
        }
        self.events.push(*event);
        Ok(())
    }
}

// ── Bench ─────────────────────────────────────────────────────

pub fn engine_with(defs: &[RelayDefinition]) -> RelayEngine<CAP> {
    engine_with_params(defs, EngineParams::default())
}

pub fn engine_with_params(defs: &[RelayDefinition], params: EngineParams) -> RelayEngine<CAP> {
    let mut reg = Registry::new();
    for def in defs {
        reg.register(def).expect("test relay table is valid");
    }
    RelayEngine::new(reg, params)
}

pub struct Bench {
    pub hw: MockHw,
    pub sink: RecordingSink,
    pub now_ms: u32,
    /// Edges are not delivered even while armed (detector unplugged).
    pub detector_dead: bool,
}

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        Self {
            hw: MockHw::new(),
            sink: RecordingSink::new(),
            now_ms: 0,
            detector_dead: false,
        }
    }

    pub fn start<const N: usize>(&mut self, svc: &mut RelayService<'_, N>) {
        svc.start(&mut self.hw);
    }

    pub fn poll<const N: usize>(&mut self, svc: &mut RelayService<'_, N>) -> usize {
        svc.poll(self.now_ms, &mut self.hw, &mut self.sink)
    }

    /// Deliver one edge right now, if the input is armed.
    pub fn edge<const N: usize>(&mut self, engine: &RelayEngine<N>) -> Option<EdgeReport> {
        if self.hw.zc_enabled && !self.detector_dead {
            Some(engine.on_zero_cross(&mut self.hw, self.now_ms))
        } else {
            None
        }
    }

    /// Advance half a mains cycle: a timer tick mid-way, then the edge, a
    /// timer tick and a relay task poll at the new time.
    pub fn half_cycle<const N: usize>(
        &mut self,
        svc: &mut RelayService<'_, N>,
    ) -> Option<EdgeReport> {
        let engine = svc.engine();
        engine.on_timer_tick(&mut self.hw, self.now_ms + TICK_MS);
        self.now_ms += HALF_CYCLE_MS;
        let report = self.edge(engine);
        engine.on_timer_tick(&mut self.hw, self.now_ms);
        self.poll(svc);
        report
    }

    /// Run half-cycles until `done` holds or `limit` is reached.  Returns
    /// how many half-cycles ran.
    pub fn run_until<const N: usize>(
        &mut self,
        svc: &mut RelayService<'_, N>,
        limit: u32,
        mut done: impl FnMut(&Self) -> bool,
    ) -> u32 {
        for n in 1..=limit {
            self.half_cycle(svc);
            if done(self) {
                return n;
            }
        }
        limit
    }
}
