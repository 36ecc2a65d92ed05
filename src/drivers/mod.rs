//! Relay and LED drivers, hardware initialisation, and task spawning.

pub mod hw_init;
pub mod relay;
pub mod status_led;
pub mod task_pin;
