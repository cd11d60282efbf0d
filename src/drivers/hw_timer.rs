//! Periodic relay timer using ESP-IDF's esp_timer API.
//!
//! Drives [`RelayEngine::on_timer_tick`] (high-current timeouts and the
//! edge watchdog).  The callback runs in the esp_timer task, not in an
//! ISR, but it still only touches atomics and the signal channel.
//!
//! On simulation targets no timer is created; tests call `on_timer_tick`
//! directly.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use super::zerocross::ZeroCrossInput;
use super::hw_init::HwInitError;
#[cfg(target_os = "espidf")]
use crate::pins::MAX_RELAYS;
#[cfg(target_os = "espidf")]
use crate::relay::RelayEngine;

#[cfg(target_os = "espidf")]
static mut RELAY_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: RELAY_TIMER is written once in `start_relay_timer()` before any
/// timer callback fires.  Only called from the main task.
#[cfg(target_os = "espidf")]
unsafe fn relay_timer() -> esp_timer_handle_t { unsafe { RELAY_TIMER } }

#[cfg(target_os = "espidf")]
unsafe extern "C" fn relay_tick_cb(arg: *mut core::ffi::c_void) {
    // SAFETY: arg is the &'static engine passed to start_relay_timer.
    let engine = unsafe { &*(arg as *const RelayEngine<MAX_RELAYS>) };
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u32;
    engine.on_timer_tick(&mut ZeroCrossInput, now_ms);
}

/// Start the periodic relay tick.
#[cfg(target_os = "espidf")]
pub fn start_relay_timer(
    engine: &'static RelayEngine<MAX_RELAYS>,
    period_ms: u32,
) -> Result<(), HwInitError> {
    // SAFETY: RELAY_TIMER is written here once at boot from the main task
    // before the timer is started.  The engine reference is 'static.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(relay_tick_cb),
            arg: engine as *const RelayEngine<MAX_RELAYS> as *mut core::ffi::c_void,
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"relay\0".as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut RELAY_TIMER);
        if ret != ESP_OK {
            return Err(HwInitError::TimerFailed(ret));
        }
        let ret = esp_timer_start_periodic(relay_timer(), u64::from(period_ms) * 1_000);
        if ret != ESP_OK {
            return Err(HwInitError::TimerFailed(ret));
        }
    }
    info!("hw_timer: relay tick every {period_ms}ms");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_relay_timer(period_ms: u32) -> Result<(), HwInitError> {
    log::info!("hw_timer(sim): relay tick ({period_ms}ms) driven by the caller");
    Ok(())
}

/// Stop the relay tick.
#[cfg(target_os = "espidf")]
pub fn stop_relay_timer() {
    // SAFETY: relay_timer() contract; null-check covers a failed start.
    unsafe {
        let t = relay_timer();
        if !t.is_null() { esp_timer_stop(t); }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_relay_timer() {}
