//! Application core: the relay task's domain logic, zero I/O.
//!
//! Command decoding, outbound events, and the [`service::RelayService`]
//! that connects the bus to the [`RelayEngine`](crate::relay::RelayEngine).
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
