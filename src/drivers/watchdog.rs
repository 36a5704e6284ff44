//! Task watchdog for the control loop.
//!
//! On ESP32 the main task subscribes to the ESP-IDF TWDT; if the loop stops
//! feeding it the chip panics and reboots with the relay released.  On the
//! host the watchdog only counts feeds so loop tests can assert on it.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, esp_task_wdt_reset,
};

use log::{info, warn};

/// Reset the chip if the loop stalls this long.
pub const WATCHDOG_TIMEOUT_MS: u32 = 5_000;

pub struct Watchdog {
    subscribed: bool,
    feeds: u64,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Subscribe the calling task.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        let cfg = esp_task_wdt_config_t {
            timeout_ms: WATCHDOG_TIMEOUT_MS,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: plain FFI calls on the current task; `cfg` outlives the call.
        let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
        if ret != ESP_OK {
            warn!("TWDT reconfigure returned {} (may already be configured)", ret);
        }
        // SAFETY: a null handle subscribes the calling task.
        let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
        let subscribed = ret == ESP_OK;
        if subscribed {
            info!("Watchdog: subscribed ({} ms, panic on trigger)", WATCHDOG_TIMEOUT_MS);
        } else {
            warn!("Watchdog: failed to subscribe ({})", ret);
        }
        Self { subscribed, feeds: 0 }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("Watchdog(sim): {} ms, feeds counted only", WATCHDOG_TIMEOUT_MS);
        Self {
            subscribed: false,
            feeds: 0,
        }
    }

    /// Feed once per loop pass.
    pub fn feed(&mut self) {
        self.feeds += 1;
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the TWDT entry of the calling task.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn feed_count(&self) -> u64 {
        self.feeds
    }
}
