//! Remote switch firmware library.
//!
//! Exposes the supervisor, console and worker for integration testing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod console;
pub mod error;
pub mod fsm;
pub mod pins;

// The implementations behind these are cfg-gated inside; host builds get
// the simulation backends.
pub mod adapters;
pub mod drivers;
pub mod sensors;

#[cfg(target_os = "espidf")]
mod esp_link_shims;
