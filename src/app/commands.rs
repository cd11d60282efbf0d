//! Inbound commands from the message bus.
//!
//! Two request topics feed the relay task.  Payloads are postcard-encoded
//! structs; anything that does not decode cleanly (wrong topic, short
//! payload, trailing bytes, unknown action tag) is a
//! [`RequestError::MalformedRequest`] and never reaches the queue.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::relay::actuator::{ActuatorId, RelayAction};

/// Switch request topic.
pub const TOPIC_RELAY_CMD: &str = "relay/value/cmd";
/// Sync-delay request topic.
pub const TOPIC_SYNC_CMD: &str = "relay/sync/cmd";
/// State notification topic.
pub const TOPIC_RELAY_STAT: &str = "relay/value/stat";

/// Payload of `relay/value/cmd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMsg {
    pub id: ActuatorId,
    pub action: RelayAction,
}

/// Payload of `relay/sync/cmd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMsg {
    pub delay_us: u32,
}

/// Commands the outside world can send into the relay task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    /// Queue `action` for relay `id` (last-write-wins).
    Switch { id: ActuatorId, action: RelayAction },
    /// Change the delay between an edge and the output write.
    SetSyncDelay { delay_us: u32 },
}

impl RelayCommand {
    /// Decode a bus message.
    pub fn decode(topic: &str, payload: &[u8]) -> Result<Self, RequestError> {
        match topic {
            TOPIC_RELAY_CMD => {
                let msg: RelayMsg = decode_exact(payload)?;
                Ok(Self::Switch {
                    id: msg.id,
                    action: msg.action,
                })
            }
            TOPIC_SYNC_CMD => {
                let msg: SyncMsg = decode_exact(payload)?;
                Ok(Self::SetSyncDelay {
                    delay_us: msg.delay_us,
                })
            }
            _ => Err(RequestError::MalformedRequest),
        }
    }

    /// Topic this command travels on.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Switch { .. } => TOPIC_RELAY_CMD,
            Self::SetSyncDelay { .. } => TOPIC_SYNC_CMD,
        }
    }

    /// Encode the payload into `buf`, returning the used prefix.
    pub fn encode<'b>(&self, buf: &'b mut [u8]) -> Option<&'b mut [u8]> {
        let out = match *self {
            Self::Switch { id, action } => postcard::to_slice(&RelayMsg { id, action }, buf),
            Self::SetSyncDelay { delay_us } => postcard::to_slice(&SyncMsg { delay_us }, buf),
        };
        out.ok()
    }
}

fn decode_exact<'de, T: Deserialize<'de>>(payload: &'de [u8]) -> Result<T, RequestError> {
    match postcard::take_from_bytes::<T>(payload) {
        Ok((value, [])) => Ok(value),
        _ => Err(RequestError::MalformedRequest),
    }
}
