//! System configuration parameters
//!
//! Timing and relay-table settings for the relay controller.  The relay
//! table is fixed-capacity so the whole config stays `no_alloc` and can be
//! stored as a postcard blob.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::app::ports::EdgeSet;
use crate::error::Error;
use crate::pins::{self, MAX_RELAYS};
use crate::relay::actuator::{LogicLevel, RelayDefinition};

/// Largest accepted `missed_edge_limit`: one second of silence at 50 Hz on
/// both edges.
pub const MAX_MISSED_EDGE_LIMIT: u32 = 100;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Zero-cross ---
    /// Mains frequency in Hz (50 or 60)
    pub mains_frequency_hz: u32,
    /// Edges of the detector signal that raise an interrupt
    pub zero_cross_edges: EdgeSet,
    /// Delay between an edge and the output write (microseconds)
    pub sync_delay_us: u32,
    /// Largest sync delay a bus request may set (microseconds)
    pub max_sync_delay_us: u32,
    /// Consecutive missing edges before pending work is flushed
    pub missed_edge_limit: u32,

    // --- Timing ---
    /// Period of the timeout / watchdog timer (milliseconds)
    pub timer_tick_ms: u32,
    /// Relay task loop interval (milliseconds)
    pub task_poll_interval_ms: u32,

    // --- Relays ---
    pub relays: Vec<RelayDefinition, MAX_RELAYS>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut relays = Vec::new();
        for def in [
            RelayDefinition::dual(
                1,
                pins::RELAY1_HIGH_GPIO,
                pins::RELAY1_LOW_GPIO,
                LogicLevel::ActiveHigh,
            ),
            RelayDefinition::dual(
                2,
                pins::RELAY2_HIGH_GPIO,
                pins::RELAY2_LOW_GPIO,
                LogicLevel::ActiveHigh,
            ),
            RelayDefinition::single(3, pins::RELAY3_GPIO, LogicLevel::ActiveHigh),
        ] {
            // Three entries always fit in MAX_RELAYS.
            let _ = relays.push(def);
        }

        Self {
            mains_frequency_hz: 50,
            zero_cross_edges: EdgeSet::Both,
            sync_delay_us: 0,
            max_sync_delay_us: 5_000,
            missed_edge_limit: 8,

            timer_tick_ms: 5,
            task_poll_interval_ms: 10,

            relays,
        }
    }
}

impl SystemConfig {
    /// Milliseconds between two interrupting edges, rounded up.
    pub fn edge_interval_ms(&self) -> u32 {
        let per_sec = self
            .mains_frequency_hz
            .saturating_mul(self.zero_cross_edges.per_cycle());
        1000_u32.div_ceil(per_sec.max(1))
    }

    /// Silence on an armed zero-cross input longer than this means the
    /// detector is gone.
    pub fn watchdog_window_ms(&self) -> u32 {
        self.edge_interval_ms().saturating_mul(self.missed_edge_limit)
    }

    /// Reject values that would break edge timing.
    pub fn validate(&self) -> Result<(), Error> {
        if !matches!(self.mains_frequency_hz, 45..=65) {
            return Err(Error::Config("mains_frequency_hz must be 45..=65"));
        }
        // Half a cycle at the highest allowed frequency.
        let half_cycle_us = 1_000_000 / (2 * 65);
        if self.max_sync_delay_us >= half_cycle_us {
            return Err(Error::Config("max_sync_delay_us must be below one half-cycle"));
        }
        if self.sync_delay_us > self.max_sync_delay_us {
            return Err(Error::Config("sync_delay_us exceeds max_sync_delay_us"));
        }
        if !(2..=MAX_MISSED_EDGE_LIMIT).contains(&self.missed_edge_limit) {
            return Err(Error::Config("missed_edge_limit must be 2..=100"));
        }
        if self.timer_tick_ms == 0 || self.timer_tick_ms > self.watchdog_window_ms() {
            return Err(Error::Config("timer_tick_ms must be within the watchdog window"));
        }
        if self.task_poll_interval_ms == 0 {
            return Err(Error::Config("task_poll_interval_ms must be non-zero"));
        }
        Ok(())
    }
}
