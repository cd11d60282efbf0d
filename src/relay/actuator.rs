//! Relay model: identity, outputs, polarity, and live state.
//!
//! A relay has one or two physical outputs.  Dual-level relays are pulled
//! in on the high-current output and then held on the low (maintenance)
//! output; single-level relays only ever use the high output.
//!
//! ```text
//!            TurnOnHigh            TurnOnLow
//!   Off ───────────────▶ OnHigh ──────────────▶ OnLow
//!    ▲                     │                      │
//!    └──────── TurnOff ────┴──────── TurnOff ─────┘
//! ```
//!
//! `state` lives in an atomic so the edge scheduler can publish it from
//! interrupt context while the relay task reads it.  Only the edge
//! scheduler writes it (`set_state` is crate-private).

use core::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::app::ports::ActuationPort;
use crate::error::ActuatorError;

/// Stable relay identifier, unique within the registry.
pub type ActuatorId = u32;

/// GPIO number of a relay output.
pub type OutputId = i32;

/// Default time a dual-level relay stays on the high-current output.
pub const DEFAULT_MAX_HIGH_MS: u32 = 100;

// ---------------------------------------------------------------------------
// Polarity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicLevel {
    /// Output high energises the coil / triac gate.
    ActiveHigh,
    /// Output low energises the coil / triac gate.
    ActiveLow,
}

impl LogicLevel {
    /// Pin level that puts an output in the `active` condition.
    pub const fn level(self, active: bool) -> bool {
        match self {
            Self::ActiveHigh => active,
            Self::ActiveLow => !active,
        }
    }
}

// ---------------------------------------------------------------------------
// State and actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RelayState {
    Off = 0,
    OnHigh = 1,
    OnLow = 2,
}

impl RelayState {
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::OnHigh,
            2 => Self::OnLow,
            _ => Self::Off,
        }
    }
}

/// Switch request carried on the bus and held in the pending-action queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RelayAction {
    TurnOff = 0,
    TurnOnHigh = 1,
    TurnOnLow = 2,
}

impl RelayAction {
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::TurnOff),
            1 => Some(Self::TurnOnHigh),
            2 => Some(Self::TurnOnLow),
            _ => None,
        }
    }

    /// State the relay ends up in once this action has been applied.
    pub const fn target_state(self) -> RelayState {
        match self {
            Self::TurnOff => RelayState::Off,
            Self::TurnOnHigh => RelayState::OnHigh,
            Self::TurnOnLow => RelayState::OnLow,
        }
    }
}

// ---------------------------------------------------------------------------
// Definition (startup configuration)
// ---------------------------------------------------------------------------

/// Static description of one relay, as stored in [`SystemConfig`](crate::config::SystemConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayDefinition {
    pub id: ActuatorId,
    /// Peak-current output.
    pub out_high: OutputId,
    /// Maintenance-current output; `None` for single-level relays.
    pub out_low: Option<OutputId>,
    pub level: LogicLevel,
    /// Milliseconds on the high output before the automatic step-down.
    /// Zero disables the step-down.
    pub max_high_ms: u32,
}

impl RelayDefinition {
    /// Dual-level relay with the default high-current time.
    pub const fn dual(id: ActuatorId, out_high: OutputId, out_low: OutputId, level: LogicLevel) -> Self {
        Self {
            id,
            out_high,
            out_low: Some(out_low),
            level,
            max_high_ms: DEFAULT_MAX_HIGH_MS,
        }
    }

    /// Single-level relay (high output only, no step-down).
    pub const fn single(id: ActuatorId, out_high: OutputId, level: LogicLevel) -> Self {
        Self {
            id,
            out_high,
            out_low: None,
            level,
            max_high_ms: 0,
        }
    }

    pub const fn with_max_high_ms(mut self, ms: u32) -> Self {
        self.max_high_ms = ms;
        self
    }
}

// ---------------------------------------------------------------------------
// Live actuator
// ---------------------------------------------------------------------------

pub struct Actuator {
    id: ActuatorId,
    high: OutputId,
    low: Option<OutputId>,
    level: LogicLevel,
    max_high_ms: u32,
    state: AtomicU8,
}

impl Actuator {
    pub(crate) fn new(def: &RelayDefinition) -> Self {
        Self {
            id: def.id,
            high: def.out_high,
            low: def.out_low,
            level: def.level,
            // A single-level relay has nothing to step down to.
            max_high_ms: if def.out_low.is_some() { def.max_high_ms } else { 0 },
            state: AtomicU8::new(RelayState::Off as u8),
        }
    }

    pub fn id(&self) -> ActuatorId {
        self.id
    }

    pub fn high_output(&self) -> OutputId {
        self.high
    }

    pub fn low_output(&self) -> Option<OutputId> {
        self.low
    }

    pub fn logic_level(&self) -> LogicLevel {
        self.level
    }

    /// Zero when the automatic step-down is disabled.
    pub fn max_high_ms(&self) -> u32 {
        self.max_high_ms
    }

    pub fn is_dual_level(&self) -> bool {
        self.low.is_some()
    }

    pub fn supports(&self, action: RelayAction) -> bool {
        action != RelayAction::TurnOnLow || self.is_dual_level()
    }

    pub fn state(&self) -> RelayState {
        RelayState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: RelayState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Drive the outputs for `action` and return the resulting state.
    ///
    /// Make-before-break: the output being energised is always driven
    /// before the one being released, so the coil never drops out on a
    /// high/low change-over.  Called from interrupt context; does not
    /// touch `state`.
    ///
    /// If a write fails part-way, every output this call energised is
    /// released again and the fault carries the state the outputs were
    /// left in, read back from the port where it can.
    pub(crate) fn drive(
        &self,
        action: RelayAction,
        hw: &mut impl ActuationPort,
    ) -> Result<RelayState, DriveFault> {
        let mut coils = Coils::of(self.state());
        if !self.supports(action) {
            return Err(DriveFault {
                error: ActuatorError::NoLowOutput,
                state: coils.state(),
            });
        }

        let steps = match action {
            RelayAction::TurnOnHigh => [(Coil::High, true), (Coil::Low, false)],
            RelayAction::TurnOnLow => [(Coil::Low, true), (Coil::High, false)],
            RelayAction::TurnOff => [(Coil::High, false), (Coil::Low, false)],
        };

        for (n, &(coil, energise)) in steps.iter().enumerate() {
            let Some(output) = self.output(coil) else {
                continue;
            };
            if let Err(error) = hw.drive(output, self.level.level(energise)) {
                for &(done, energised) in &steps[..n] {
                    if energised && self.release(done, hw).is_ok() {
                        coils.set(done, false);
                    }
                }
                return Err(DriveFault {
                    error,
                    state: self.read_back(coils, hw),
                });
            }
            coils.set(coil, energise);
        }

        Ok(action.target_state())
    }

    fn output(&self, coil: Coil) -> Option<OutputId> {
        match coil {
            Coil::High => Some(self.high),
            Coil::Low => self.low,
        }
    }

    fn release(&self, coil: Coil, hw: &mut impl ActuationPort) -> Result<(), ActuatorError> {
        match self.output(coil) {
            Some(output) => hw.drive(output, self.level.level(false)),
            None => Ok(()),
        }
    }

    /// Prefer what the port reports over the levels we think we wrote.
    fn read_back(&self, mut coils: Coils, hw: &mut impl ActuationPort) -> RelayState {
        let active = self.level.level(true);
        for coil in [Coil::High, Coil::Low] {
            if let Some(level) = self.output(coil).and_then(|o| hw.read_state(o)) {
                coils.set(coil, level == active);
            }
        }
        coils.state()
    }
}

/// A drive that did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveFault {
    pub error: ActuatorError,
    /// Where the outputs were left.  `OnHigh` whenever the high-current
    /// output is still energised.
    pub state: RelayState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coil {
    High,
    Low,
}

/// Energised outputs of one relay.
#[derive(Debug, Clone, Copy)]
struct Coils {
    high: bool,
    low: bool,
}

impl Coils {
    fn of(state: RelayState) -> Self {
        match state {
            RelayState::Off => Self { high: false, low: false },
            RelayState::OnHigh => Self { high: true, low: false },
            RelayState::OnLow => Self { high: false, low: true },
        }
    }

    fn set(&mut self, coil: Coil, on: bool) {
        match coil {
            Coil::High => self.high = on,
            Coil::Low => self.low = on,
        }
    }

    fn state(self) -> RelayState {
        if self.high {
            RelayState::OnHigh
        } else if self.low {
            RelayState::OnLow
        } else {
            RelayState::Off
        }
    }
}

impl core::fmt::Debug for Actuator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Actuator")
            .field("id", &self.id)
            .field("high", &self.high)
            .field("low", &self.low)
            .field("level", &self.level)
            .field("max_high_ms", &self.max_high_ms)
            .field("state", &self.state())
            .finish()
    }
}
