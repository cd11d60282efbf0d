//! Zero-cross synchronised relay firmware library.
//!
//! Exposes the engine and the relay task logic for integration testing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, with host simulation fallbacks.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod pins;
pub mod relay;

pub mod adapters;
pub mod drivers;

pub use error::{Error, Result};
pub use relay::RelayEngine;
