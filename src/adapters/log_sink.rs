//! Log-based status sink adapter.
//!
//! Implements [`StatusSink`] by writing relay events to the ESP-IDF logger
//! (UART / USB-CDC in production).  Used when no bus transport is attached,
//! and as a mirror next to the bus sink.

use log::{info, warn};

use crate::app::events::RelayEvent;
use crate::app::ports::StatusSink;
use crate::error::PublishError;

/// Adapter that logs every [`RelayEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogStatusSink;

impl LogStatusSink {
    pub fn new() -> Self {
        Self
    }
}

impl StatusSink for LogStatusSink {
    fn publish(&mut self, event: &RelayEvent) -> Result<(), PublishError> {
        match event {
            RelayEvent::StateChanged { id, state } => {
                info!("RELAY | id={} state={:?}", id, state);
            }
            RelayEvent::ActuationFailed {
                id,
                action,
                state,
                cause,
            } => {
                warn!(
                    "RELAY | id={} FAILED action={:?} cause={:?} state={:?}",
                    id, action, cause, state
                );
            }
        }
        Ok(())
    }
}

/// Publishes to two sinks.  The second still gets the event if the first
/// refuses it; the first error is returned.
pub struct TeeSink<A, B> {
    pub primary: A,
    pub mirror: B,
}

impl<A: StatusSink, B: StatusSink> StatusSink for TeeSink<A, B> {
    fn publish(&mut self, event: &RelayEvent) -> Result<(), PublishError> {
        let first = self.primary.publish(event);
        let second = self.mirror.publish(event);
        first.and(second)
    }
}
