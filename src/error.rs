//! Unified error types for the relay firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the relay
//! task's error handling stays uniform.  All variants are `Copy`: the edge
//! scheduler records actuation failures from interrupt context and must not
//! allocate to do so.

use core::fmt;

use crate::relay::actuator::{ActuatorId, OutputId, RelayAction};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An inbound switch or sync request was rejected at intake.
    Request(RequestError),
    /// A relay output could not be driven.
    Actuator(ActuatorError),
    /// A relay definition could not be registered.
    Registry(RegistryError),
    /// The outbound notification bus refused a message.
    Publish(PublishError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "request: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Intake errors
// ---------------------------------------------------------------------------

/// Reasons command intake rejects a request.  A rejected request never
/// touches the pending-action queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// The id does not name a registered relay.
    UnknownActuator(ActuatorId),
    /// The payload could not be decoded into a command.
    MalformedRequest,
    /// The relay has no low-current output, so it cannot hold `TurnOnLow`.
    UnsupportedAction {
        id: ActuatorId,
        action: RelayAction,
    },
    /// The requested sync delay exceeds the configured ceiling.
    SyncDelayOutOfRange(u32),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownActuator(id) => write!(f, "unknown relay {id}"),
            Self::MalformedRequest => write!(f, "malformed request"),
            Self::UnsupportedAction { id, action } => {
                write!(f, "relay {id} does not support {action:?}")
            }
            Self::SyncDelayOutOfRange(us) => write!(f, "sync delay {us}us out of range"),
        }
    }
}

impl From<RequestError> for Error {
    fn from(e: RequestError) -> Self {
        Self::Request(e)
    }
}

// ---------------------------------------------------------------------------
// Actuation errors
// ---------------------------------------------------------------------------

/// Raised by an [`ActuationPort`](crate::app::ports::ActuationPort) when an
/// output cannot be driven.  Never retried in interrupt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// The GPIO level write was refused by the driver.
    GpioWriteFailed(OutputId),
    /// No pin is mapped to the requested output.
    UnmappedOutput(OutputId),
    /// A low-current action reached a single-level relay.
    NoLowOutput,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed(pin) => write!(f, "GPIO{pin} write failed"),
            Self::UnmappedOutput(pin) => write!(f, "GPIO{pin} not mapped"),
            Self::NoLowOutput => write!(f, "relay has no low-current output"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Another relay already uses this id.
    DuplicateId(ActuatorId),
    /// High and low control share one output.
    SharedOutput(OutputId),
    /// Every slot is taken.  The pending-action queue is sized by the
    /// registry, so this is the only place it can run out of room.
    QueueFull,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "duplicate relay id {id}"),
            Self::SharedOutput(pin) => write!(f, "GPIO{pin} used for both high and low control"),
            Self::QueueFull => write!(f, "relay registry full"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// The bus has no room for another message.
    BusFull,
    /// The message could not be serialised.
    EncodeFailed,
    /// The bus transport is down.
    Disconnected,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFull => write!(f, "bus full"),
            Self::EncodeFailed => write!(f, "encode failed"),
            Self::Disconnected => write!(f, "bus disconnected"),
        }
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
