//! Port traits: the hexagonal boundary between the relay engine and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RelayEngine / RelayService
//! ```
//!
//! Driven adapters (relay outputs, the zero-cross input, the status bus)
//! implement these traits.  The engine and the relay task consume them via
//! generics, so the domain core never touches a GPIO register directly and
//! every path runs on the host against mocks.
//!
//! `ActuationPort` and `ZeroCrossPort` are called from the zero-cross ISR.
//! Implementations must not block, allocate, or log.

use serde::{Deserialize, Serialize};

use crate::error::{ActuatorError, PublishError};
use crate::relay::actuator::OutputId;

use super::events::RelayEvent;

// ───────────────────────────────────────────────────────────────
// Actuation port (driven adapter: engine → relay outputs)
// ───────────────────────────────────────────────────────────────

/// Write-side port for relay outputs.  Levels are raw pin levels; polarity
/// has already been applied by the caller.
pub trait ActuationPort {
    /// Set output `output` to `level` (true = pin high).
    fn drive(&mut self, output: OutputId, level: bool) -> Result<(), ActuatorError>;

    /// Read back the level last driven on `output`, if the adapter can.
    fn read_state(&mut self, output: OutputId) -> Option<bool>;
}

// ───────────────────────────────────────────────────────────────
// Zero-cross port (driven adapter: engine ↔ edge interrupt source)
// ───────────────────────────────────────────────────────────────

/// Which mains zero-cross edges raise an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeSet {
    Rising,
    Falling,
    /// Both edges: one interrupt per half-cycle.
    #[default]
    Both,
}

impl EdgeSet {
    /// Interrupts per mains cycle.
    pub const fn per_cycle(self) -> u32 {
        match self {
            Self::Rising | Self::Falling => 1,
            Self::Both => 2,
        }
    }
}

/// Arms and disarms the zero-cross interrupt.  The engine only keeps the
/// interrupt enabled while there is pending work.
pub trait ZeroCrossPort {
    fn enable(&mut self, edges: EdgeSet);
    fn disable(&mut self, edges: EdgeSet);
}

// ───────────────────────────────────────────────────────────────
// Status sink (driven adapter: relay task → message bus)
// ───────────────────────────────────────────────────────────────

/// The relay task publishes every [`RelayEvent`] through this port.
/// Adapters decide where it goes (bus topic, serial log, test recorder).
pub trait StatusSink {
    fn publish(&mut self, event: &RelayEvent) -> Result<(), PublishError>;
}
