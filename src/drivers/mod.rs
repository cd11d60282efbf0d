//! Relay output drivers, zero-cross interrupt glue, and peripheral helpers.

pub mod hw_init;
pub mod hw_timer;
pub mod relay_outputs;
pub mod watchdog;
pub mod zerocross;
