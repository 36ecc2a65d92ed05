//! System adapter: heap statistics and restart.

use log::warn;

use crate::app::ports::SystemPort;

pub struct EspSystem;

impl Default for EspSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl EspSystem {
    pub fn new() -> Self {
        Self
    }
}

impl SystemPort for EspSystem {
    #[cfg(target_os = "espidf")]
    fn free_heap(&self) -> u32 {
        unsafe { esp_idf_svc::sys::esp_get_free_heap_size() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn free_heap(&self) -> u32 {
        0
    }

    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        warn!("System: restarting");
        unsafe { esp_idf_svc::sys::esp_restart() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        warn!("System(sim): restart requested, exiting");
        std::process::exit(0);
    }
}
