//! Actuator registry.
//!
//! Fixed-capacity table of relays, filled once at startup.  The registry is
//! moved into the [`RelayEngine`](super::RelayEngine) when the engine is
//! built, and the engine only hands out `&Registry`, so registering a relay
//! after switching has started cannot be expressed.

use heapless::Vec;
use log::{info, warn};

use super::actuator::{Actuator, ActuatorId, RelayDefinition};
use crate::error::RegistryError;

/// Non-owning handle to a registered relay.  Also the relay's slot index
/// in the pending-action queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActuatorRef(pub(crate) usize);

impl ActuatorRef {
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct Registry<const N: usize> {
    actuators: Vec<Actuator, N>,
}

impl<const N: usize> Default for Registry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Registry<N> {
    pub const fn new() -> Self {
        Self { actuators: Vec::new() }
    }

    /// Add a relay.  Scan order of the edge scheduler follows registration
    /// order.
    pub fn register(&mut self, def: &RelayDefinition) -> Result<ActuatorRef, RegistryError> {
        if self.find(def.id).is_some() {
            return Err(RegistryError::DuplicateId(def.id));
        }
        if def.out_low == Some(def.out_high) {
            return Err(RegistryError::SharedOutput(def.out_high));
        }
        if def.out_low.is_none() && def.max_high_ms > 0 {
            warn!(
                "Registry: relay {} is single-level, ignoring max_high_ms={}",
                def.id, def.max_high_ms
            );
        }

        let idx = self.actuators.len();
        self.actuators
            .push(Actuator::new(def))
            .map_err(|_| RegistryError::QueueFull)?;

        info!(
            "Registry: relay {} at slot {} (high=GPIO{}, low={:?}, {:?}, max_high={}ms)",
            def.id, idx, def.out_high, def.out_low, def.level, def.max_high_ms
        );
        Ok(ActuatorRef(idx))
    }

    pub fn find(&self, id: ActuatorId) -> Option<ActuatorRef> {
        self.actuators
            .iter()
            .position(|a| a.id() == id)
            .map(ActuatorRef)
    }

    pub fn get(&self, r: ActuatorRef) -> &Actuator {
        &self.actuators[r.0]
    }

    pub(crate) fn by_index(&self, idx: usize) -> &Actuator {
        &self.actuators[idx]
    }

    /// Read-only walk in slot order.
    pub fn for_each(&self, mut f: impl FnMut(ActuatorRef, &Actuator)) {
        for (i, a) in self.actuators.iter().enumerate() {
            f(ActuatorRef(i), a);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actuator> {
        self.actuators.iter()
    }

    pub fn len(&self) -> usize {
        self.actuators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actuators.is_empty()
    }
}
