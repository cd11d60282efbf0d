//! Message-bus boundary.
//!
//! The pub/sub transport itself lives outside this crate.  It hands
//! inbound messages to [`MessageBus::deliver`] and drains
//! [`MessageBus::next_outbound`]; the relay task sits on the other side of
//! the two bounded queues.
//!
//! ```text
//!   transport ──deliver──▶ [inbound]  ──next_inbound──▶ relay task
//!   transport ◀──drain─── [outbound] ◀──BusStatusSink── relay task
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::{String, Vec};

use crate::app::commands::TOPIC_RELAY_STAT;
use crate::app::events::{RelayEvent, STATUS_MSG_MAX_LEN};
use crate::app::ports::StatusSink;
use crate::error::PublishError;

pub const TOPIC_CAP: usize = 32;
pub const PAYLOAD_CAP: usize = 16;
const BUS_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String<TOPIC_CAP>,
    pub payload: Vec<u8, PAYLOAD_CAP>,
}

impl BusMessage {
    /// Copy `topic` and `payload` into a fixed-size message.
    pub fn new(topic: &str, payload: &[u8]) -> Result<Self, PublishError> {
        Ok(Self {
            topic: String::try_from(topic).map_err(|_| PublishError::EncodeFailed)?,
            payload: Vec::from_slice(payload).map_err(|_| PublishError::EncodeFailed)?,
        })
    }
}

pub struct MessageBus {
    inbound: Channel<CriticalSectionRawMutex, BusMessage, BUS_DEPTH>,
    outbound: Channel<CriticalSectionRawMutex, BusMessage, BUS_DEPTH>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub const fn new() -> Self {
        Self {
            inbound: Channel::new(),
            outbound: Channel::new(),
        }
    }

    /// Transport side: queue a received message for the relay task.
    pub fn deliver(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let msg = BusMessage::new(topic, payload)?;
        self.inbound.try_send(msg).map_err(|_| PublishError::BusFull)
    }

    /// Relay task side: next received message.
    pub fn next_inbound(&self) -> Option<BusMessage> {
        self.inbound.try_receive().ok()
    }

    /// Transport side: next message to send.
    pub fn next_outbound(&self) -> Option<BusMessage> {
        self.outbound.try_receive().ok()
    }

    pub fn status_sink(&self) -> BusStatusSink<'_> {
        BusStatusSink { bus: self }
    }
}

/// Publishes each [`RelayEvent`] as a postcard
/// [`StatusMsg`](crate::app::events::StatusMsg) on `relay/value/stat`.
pub struct BusStatusSink<'b> {
    bus: &'b MessageBus,
}

impl StatusSink for BusStatusSink<'_> {
    fn publish(&mut self, event: &RelayEvent) -> Result<(), PublishError> {
        let mut buf = [0u8; STATUS_MSG_MAX_LEN];
        let bytes = event.to_status().encode(&mut buf)?;
        let msg = BusMessage::new(TOPIC_RELAY_STAT, bytes)?;
        self.bus
            .outbound
            .try_send(msg)
            .map_err(|_| PublishError::BusFull)
    }
}
