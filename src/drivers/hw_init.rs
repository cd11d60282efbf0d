//! One-shot hardware peripheral initialization.
//!
//! Configures the relay outputs and the zero-cross input using raw ESP-IDF
//! sys calls, and installs the zero-cross GPIO interrupt.  Called once
//! from `main()` before the relay task starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;
#[cfg(target_os = "espidf")]
use crate::relay::RelayEngine;
#[cfg(target_os = "espidf")]
use crate::pins::MAX_RELAYS;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrHandlerFailed(i32),
    TimerFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrHandlerFailed(rc) => write!(f, "zero-cross handler add failed (rc={})", rc),
            Self::TimerFailed(rc) => write!(f, "esp_timer setup failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

/// `Error` is `Copy` and carries no code, so the return code is logged here.
impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        log::error!("hw_init: {e}");
        Self::Init(match e {
            HwInitError::GpioConfigFailed(_) => "GPIO config failed",
            HwInitError::IsrInstallFailed(_) => "GPIO ISR service install failed",
            HwInitError::IsrHandlerFailed(_) => "zero-cross handler add failed",
            HwInitError::TimerFailed(_) => "esp_timer setup failed",
        })
    }
}

/// Configure every relay output (driven to `inactive` levels) and the
/// zero-cross input.  `outputs` pairs each GPIO with its inactive level.
#[cfg(target_os = "espidf")]
pub fn init_peripherals(outputs: &[(i32, bool)]) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the ISR is installed and the
    // relay task starts; single-threaded.
    unsafe {
        init_relay_outputs(outputs)?;
        init_zero_cross_input()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(outputs: &[(i32, bool)]) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): {} relay outputs, peripheral init skipped", outputs.len());
    Ok(())
}

// ── Relay outputs ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_relay_outputs(outputs: &[(i32, bool)]) -> Result<(), HwInitError> {
    for &(pin, inactive) in outputs {
        // Set the level before switching to output so the coil never
        // sees a glitch at boot.
        unsafe { gpio_set_level(pin, u32::from(inactive)) };
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    }

    info!("hw_init: {} relay outputs configured", outputs.len());
    Ok(())
}

/// Drive a relay output.  ISR-safe: a single register write.
#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), i32> {
    // SAFETY: gpio_set_level writes to an output configured in
    // init_relay_outputs(); it is IRAM-safe and takes no lock.
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret == ESP_OK as i32 { Ok(()) } else { Err(ret) }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) -> Result<(), i32> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access; outputs are configured in
    // INPUT_OUTPUT mode so the level reads back.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    false
}

// ── Zero-cross input ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_zero_cross_input() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::ZERO_CROSS_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        // Armed later, only while work is queued.
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    info!("hw_init: zero-cross input on GPIO{}", pins::ZERO_CROSS_GPIO);
    Ok(())
}

// ── GPIO ISR Service ──────────────────────────────────────────

/// Install the GPIO ISR service and wire the zero-cross handler to
/// `engine`.  The interrupt itself stays disabled until the relay task
/// arms it.
#[cfg(target_os = "espidf")]
pub fn init_isr_service(engine: &'static RelayEngine<MAX_RELAYS>) -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).  The handler argument is
    // a 'static shared reference, valid for the lifetime of the program.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        gpio_intr_disable(pins::ZERO_CROSS_GPIO);
        let arg = engine as *const RelayEngine<MAX_RELAYS> as *mut core::ffi::c_void;
        let ret = gpio_isr_handler_add(
            pins::ZERO_CROSS_GPIO,
            Some(super::zerocross::zero_cross_isr),
            arg,
        );
        if ret != ESP_OK {
            return Err(HwInitError::IsrHandlerFailed(ret));
        }
    }
    info!("hw_init: ISR service installed (zero-cross, disarmed)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
