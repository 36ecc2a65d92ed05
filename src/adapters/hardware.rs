//! Hardware adapter: bridges the real peripherals to domain port traits.
//!
//! Owns the supply-detect sensor, the relay, and the status LED, exposing
//! them through [`SensorPort`], [`ActuatorPort`] and [`IndicatorPort`].
//! On non-espidf targets the underlying drivers use cfg-gated simulation
//! stubs.

use embedded_hal::delay::DelayNs;

use crate::app::ports::{ActuatorPort, IndicatorPort, SensorPort};
use crate::drivers::relay::Relay;
use crate::drivers::status_led::{LedColour, StatusLed};
use crate::error::{ActuatorError, SensorError};
use crate::sensors::SupplyDetect;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<D> {
    sensor: SupplyDetect,
    relay: Relay,
    led: StatusLed,
    delay: D,
}

impl<D: DelayNs> HardwareAdapter<D> {
    pub fn new(sensor: SupplyDetect, relay: Relay, led: StatusLed, delay: D) -> Self {
        Self {
            sensor,
            relay,
            led,
            delay,
        }
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    pub fn led(&self) -> &StatusLed {
        &self.led
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<D: DelayNs> SensorPort for HardwareAdapter<D> {
    fn detect(&mut self) -> Result<bool, SensorError> {
        self.sensor.detect()
    }
}

/// The console samples the detect channel on its own, outside the adapter.
impl SensorPort for SupplyDetect {
    fn detect(&mut self) -> Result<bool, SensorError> {
        SupplyDetect::detect(self)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<D: DelayNs> ActuatorPort for HardwareAdapter<D> {
    fn pulse(&mut self, duration_ms: u32) -> Result<(), ActuatorError> {
        self.relay.pulse(duration_ms, &mut self.delay)
    }
}

// ── IndicatorPort implementation ──────────────────────────────

impl<D: DelayNs> IndicatorPort for HardwareAdapter<D> {
    fn show_idle(&mut self) {
        self.led.set(LedColour::Red);
    }

    fn show_serving(&mut self) {
        self.led.set(LedColour::Green);
    }
}
