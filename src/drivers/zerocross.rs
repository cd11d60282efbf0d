//! Zero-cross input and the interrupt glue around the edge scheduler.
//!
//! [`ZeroCrossInput`] arms and disarms the detector interrupt.
//! [`EdgeHardware`] is everything the edge scheduler touches in one value:
//! relay outputs, the zero-cross input and a busy-wait delay.  The ISR
//! builds one on its stack per edge.

use embedded_hal::delay::DelayNs;

use crate::app::ports::{ActuationPort, EdgeSet, ZeroCrossPort};
use crate::error::ActuatorError;
use crate::relay::actuator::OutputId;

use super::relay_outputs::GpioRelayOutputs;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use crate::pins::{self, MAX_RELAYS};
#[cfg(target_os = "espidf")]
use crate::relay::RelayEngine;

// ── Zero-cross input ──────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroCrossInput;

#[cfg(target_os = "espidf")]
fn intr_type(edges: EdgeSet) -> gpio_int_type_t {
    match edges {
        EdgeSet::Rising => gpio_int_type_t_GPIO_INTR_POSEDGE,
        EdgeSet::Falling => gpio_int_type_t_GPIO_INTR_NEGEDGE,
        EdgeSet::Both => gpio_int_type_t_GPIO_INTR_ANYEDGE,
    }
}

#[cfg(target_os = "espidf")]
impl ZeroCrossPort for ZeroCrossInput {
    fn enable(&mut self, edges: EdgeSet) {
        // SAFETY: register writes on the input configured in hw_init;
        // both calls are ISR-safe.
        unsafe {
            gpio_set_intr_type(pins::ZERO_CROSS_GPIO, intr_type(edges));
            gpio_intr_enable(pins::ZERO_CROSS_GPIO);
        }
    }

    fn disable(&mut self, _edges: EdgeSet) {
        // SAFETY: as above.
        unsafe {
            gpio_intr_disable(pins::ZERO_CROSS_GPIO);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl ZeroCrossPort for ZeroCrossInput {
    fn enable(&mut self, _edges: EdgeSet) {}
    fn disable(&mut self, _edges: EdgeSet) {}
}

// ── Busy-wait delay ───────────────────────────────────────────

/// Microsecond busy-wait usable in interrupt context.
#[derive(Debug, Default, Clone, Copy)]
pub struct IsrDelay;

#[cfg(target_os = "espidf")]
impl DelayNs for IsrDelay {
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_hal::delay::Ets.delay_ns(ns);
    }

    fn delay_us(&mut self, us: u32) {
        esp_idf_hal::delay::Ets.delay_us(us);
    }
}

#[cfg(not(target_os = "espidf"))]
impl DelayNs for IsrDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}

// ── Edge hardware bundle ──────────────────────────────────────

#[derive(Debug, Default)]
pub struct EdgeHardware {
    pub outputs: GpioRelayOutputs,
    pub zero_cross: ZeroCrossInput,
    pub delay: IsrDelay,
}

impl ActuationPort for EdgeHardware {
    fn drive(&mut self, output: OutputId, level: bool) -> Result<(), ActuatorError> {
        self.outputs.drive(output, level)
    }

    fn read_state(&mut self, output: OutputId) -> Option<bool> {
        self.outputs.read_state(output)
    }
}

impl ZeroCrossPort for EdgeHardware {
    fn enable(&mut self, edges: EdgeSet) {
        self.zero_cross.enable(edges);
    }

    fn disable(&mut self, edges: EdgeSet) {
        self.zero_cross.disable(edges);
    }
}

impl DelayNs for EdgeHardware {
    fn delay_ns(&mut self, ns: u32) {
        self.delay.delay_ns(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}

// ── ISR ───────────────────────────────────────────────────────

/// GPIO interrupt handler registered by `hw_init::init_isr_service`.
/// `arg` is the `'static` engine.
#[cfg(target_os = "espidf")]
pub(crate) unsafe extern "C" fn zero_cross_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: arg was produced from a &'static RelayEngine in
    // init_isr_service and is never freed.
    let engine = unsafe { &*(arg as *const RelayEngine<MAX_RELAYS>) };
    // SAFETY: esp_timer_get_time is a counter read; safe in ISR context.
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u32;
    let mut hw = EdgeHardware::default();
    engine.on_zero_cross(&mut hw, now_ms);
}
