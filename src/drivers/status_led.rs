//! Red/green status LED driver.
//!
//! Two LEDC PWM channels (CH0 red, CH1 green).  Exactly one is lit:
//! red while the service is stopped, green while it runs.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LEDC channels via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::pins;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColour {
    Off,
    Red,
    Green,
}

pub struct StatusLed {
    current: LedColour,
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLed {
    pub fn new() -> Self {
        Self {
            current: LedColour::Off,
        }
    }

    pub fn set(&mut self, colour: LedColour) {
        let (red, green) = match colour {
            LedColour::Off => (0, 0),
            LedColour::Red => (pins::LED_ON_DUTY, 0),
            LedColour::Green => (0, pins::LED_ON_DUTY),
        };
        hw_init::ledc_set(hw_init::LEDC_CH_LED_RED, red);
        hw_init::ledc_set(hw_init::LEDC_CH_LED_GREEN, green);
        self.current = colour;
    }

    pub fn current(&self) -> LedColour {
        self.current
    }
}
