//! GPIO assignments for the relay controller board.
//!
//! Single source of truth: the default relay table in
//! [`SystemConfig`](crate::config::SystemConfig) and the hardware init code
//! both reference this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Zero-cross detector (optocoupler on the mains side)
// ---------------------------------------------------------------------------

/// Digital input: one pulse edge per mains zero crossing.
pub const ZERO_CROSS_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Relay drivers (ULN2003 low-side array, active HIGH)
// ---------------------------------------------------------------------------

/// Relay 1 pull-in (high-current) coil drive.
pub const RELAY1_HIGH_GPIO: i32 = 5;
/// Relay 1 hold (low-current) coil drive through the economiser resistor.
pub const RELAY1_LOW_GPIO: i32 = 6;

pub const RELAY2_HIGH_GPIO: i32 = 7;
pub const RELAY2_LOW_GPIO: i32 = 15;

/// Relay 3 is a triac (single-level, no hold output).
pub const RELAY3_GPIO: i32 = 16;

/// Capacity of the relay registry and the pending-action queue.
pub const MAX_RELAYS: usize = 8;
