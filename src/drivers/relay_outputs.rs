//! Relay output adapters implementing [`ActuationPort`].
//!
//! - [`GpioRelayOutputs`]: raw ESP-IDF GPIO writes by pin number.  Zero
//!   sized, so the ISR can build one per edge.
//! - [`PinBank`]: any set of `embedded-hal` stateful output pins mapped
//!   to output ids.  Useful on boards where relays sit behind an I/O
//!   expander, and on the host.

use embedded_hal::digital::{PinState, StatefulOutputPin};
use heapless::Vec;

use crate::app::ports::ActuationPort;
use crate::error::ActuatorError;
use crate::relay::actuator::OutputId;

use super::hw_init;

/// GPIO numbers above this do not exist on the ESP32-S3.
const MAX_GPIO: OutputId = 48;

#[derive(Debug, Default, Clone, Copy)]
pub struct GpioRelayOutputs;

impl ActuationPort for GpioRelayOutputs {
    fn drive(&mut self, output: OutputId, level: bool) -> Result<(), ActuatorError> {
        if !(0..=MAX_GPIO).contains(&output) {
            return Err(ActuatorError::UnmappedOutput(output));
        }
        hw_init::gpio_write(output, level).map_err(|_| ActuatorError::GpioWriteFailed(output))
    }

    #[cfg(target_os = "espidf")]
    fn read_state(&mut self, output: OutputId) -> Option<bool> {
        (0..=MAX_GPIO)
            .contains(&output)
            .then(|| hw_init::gpio_read(output))
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_state(&mut self, _output: OutputId) -> Option<bool> {
        None
    }
}

/// Output ids mapped onto `embedded-hal` pins.
pub struct PinBank<P, const K: usize> {
    pins: Vec<(OutputId, P), K>,
}

impl<P, const K: usize> Default for PinBank<P, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, const K: usize> PinBank<P, K> {
    pub const fn new() -> Self {
        Self { pins: Vec::new() }
    }

    /// Map `output` to `pin`.  Hands the pin back if the bank is full.
    pub fn add(&mut self, output: OutputId, pin: P) -> Result<(), P> {
        self.pins.push((output, pin)).map_err(|(_, pin)| pin)
    }

    fn pin_mut(&mut self, output: OutputId) -> Option<&mut P> {
        self.pins
            .iter_mut()
            .find(|(id, _)| *id == output)
            .map(|(_, pin)| pin)
    }
}

impl<P: StatefulOutputPin, const K: usize> ActuationPort for PinBank<P, K> {
    fn drive(&mut self, output: OutputId, level: bool) -> Result<(), ActuatorError> {
        let pin = self
            .pin_mut(output)
            .ok_or(ActuatorError::UnmappedOutput(output))?;
        pin.set_state(PinState::from(level))
            .map_err(|_| ActuatorError::GpioWriteFailed(output))
    }

    fn read_state(&mut self, output: OutputId) -> Option<bool> {
        self.pin_mut(output)?.is_set_high().ok()
    }
}
