//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                     |
//! |------------|--------------|---------------------------------|
//! | `bus`      | StatusSink   | Inbound/outbound bus queues     |
//! | `log_sink` | StatusSink   | Serial log output               |
//! | `time`     | (clock)      | ESP32 system timer              |
//!
//! Relay outputs and the zero-cross input are in [`crate::drivers`]: they
//! run in interrupt context and stay next to the raw GPIO code.

pub mod bus;
pub mod log_sink;
pub mod time;
