//! Relay driver.
//!
//! A pulse drives the relay GPIO high, holds it for the requested time,
//! then drives it low again.  The output is forced low even when the hold
//! is cut short by a write failure on the rising edge.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: writes the relay pin via hw_init.
//! On host/test: tracks the pulse count in memory only.

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::drivers::hw_init;
use crate::error::ActuatorError;
use crate::pins;

/// Longest accepted pulse.  Anything longer is a caller bug.
pub const MAX_PULSE_MS: u32 = 10_000;

pub struct Relay {
    energised: bool,
    pulses: u32,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    pub fn new() -> Self {
        Self {
            energised: false,
            pulses: 0,
        }
    }

    pub fn pulse(&mut self, duration_ms: u32, delay: &mut impl DelayNs) -> Result<(), ActuatorError> {
        if duration_ms == 0 || duration_ms > MAX_PULSE_MS {
            return Err(ActuatorError::InvalidDuration);
        }

        debug!("Relay: pulse {} ms", duration_ms);
        let rising = self.drive(true);
        if rising.is_ok() {
            delay.delay_ms(duration_ms);
        }
        let falling = self.drive(false);
        rising?;
        falling?;

        self.pulses = self.pulses.wrapping_add(1);
        Ok(())
    }

    fn drive(&mut self, high: bool) -> Result<(), ActuatorError> {
        hw_init::gpio_write(pins::RELAY_GPIO, high).map_err(ActuatorError::GpioWriteFailed)?;
        self.energised = high;
        Ok(())
    }

    pub fn is_energised(&self) -> bool {
        self.energised
    }

    /// Completed pulses since boot.
    pub fn pulse_count(&self) -> u32 {
        self.pulses
    }
}
