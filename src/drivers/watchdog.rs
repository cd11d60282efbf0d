//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the relay task stalls.  Separate from the edge
//! watchdog in the engine, which only guards the zero-cross input.
//!
//! The relay task must call `feed()` on every loop iteration.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Default TWDT timeout for the relay task.
pub const TASK_WDT_TIMEOUT_MS: u32 = 5_000;

pub struct TaskWatchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    feeds: u32,
}

impl Default for TaskWatchdog {
    fn default() -> Self {
        Self::new(TASK_WDT_TIMEOUT_MS)
    }
}

impl TaskWatchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: TWDT config calls from task context at boot.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!("TWDT reconfigure returned {} (may already be configured)", ret);
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    info!("TaskWatchdog: relay task subscribed ({timeout_ms}ms, panic on trigger)");
                } else {
                    log::warn!("TaskWatchdog: failed to subscribe ({})", ret);
                }

                Self { subscribed, feeds: 0 }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("TaskWatchdog(sim): {timeout_ms}ms, no-op");
            Self { feeds: 0 }
        }
    }

    pub fn feed(&mut self) {
        self.feeds = self.feeds.wrapping_add(1);
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: resets the TWDT entry of the calling task.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }

    pub fn feeds(&self) -> u32 {
        self.feeds
    }
}
