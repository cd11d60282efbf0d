//! Outbound relay events.
//!
//! The [`RelayService`](super::service::RelayService) emits these through
//! the [`StatusSink`](super::ports::StatusSink) port after the edge
//! scheduler has finished an action.  Adapters decide what to do with them:
//! publish a [`StatusMsg`] on `relay/value/stat`, log to serial, or record
//! them in a test.

use serde::{Deserialize, Serialize};

use crate::error::PublishError;
use crate::relay::FailureCause;
use crate::relay::actuator::{ActuatorId, RelayAction, RelayState};

/// Largest encoded [`StatusMsg`]: varint id (5) + state (1) + failed (1).
pub const STATUS_MSG_MAX_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEvent {
    /// An action was applied on a zero-cross edge.
    StateChanged { id: ActuatorId, state: RelayState },

    /// An action could not be applied.  `state` is the unchanged state the
    /// relay is still in.
    ActuationFailed {
        id: ActuatorId,
        action: RelayAction,
        state: RelayState,
        cause: FailureCause,
    },
}

impl RelayEvent {
    pub fn id(&self) -> ActuatorId {
        match self {
            Self::StateChanged { id, .. } | Self::ActuationFailed { id, .. } => *id,
        }
    }

    /// Wire form for the status topic.
    pub fn to_status(&self) -> StatusMsg {
        match *self {
            Self::StateChanged { id, state } => StatusMsg {
                id,
                state,
                failed: false,
            },
            Self::ActuationFailed { id, state, .. } => StatusMsg {
                id,
                state,
                failed: true,
            },
        }
    }
}

/// Payload of `relay/value/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMsg {
    pub id: ActuatorId,
    pub state: RelayState,
    pub failed: bool,
}

impl StatusMsg {
    pub fn encode<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], PublishError> {
        postcard::to_slice(self, buf).map_err(|_| PublishError::EncodeFailed)
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        match postcard::take_from_bytes::<Self>(bytes) {
            Ok((msg, [])) => Some(msg),
            _ => None,
        }
    }
}
