//! Supply-detect sensor.
//!
//! The switched supply reaches ADC1 through a 12 kΩ / 2 kΩ divider.  The
//! calibrated pin voltage is scaled back up to the supply voltage and
//! compared with a fixed threshold.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads calibrated millivolts via hw_init.
//! On host/test: reads from a static `AtomicU32` for injection.

use core::sync::atomic::{AtomicU32, Ordering};

use log::debug;

use crate::error::SensorError;
use crate::pins;

/// Upper divider resistor, kΩ.
pub const DIVIDER_HIGH_KOHM: u32 = 12;
/// Lower divider resistor, kΩ.
pub const DIVIDER_LOW_KOHM: u32 = 2;
/// Supply above this many millivolts reads as ON.
pub const ON_THRESHOLD_MV: u32 = 2_000;

#[cfg_attr(target_os = "espidf", allow(dead_code))]
static SIM_PIN_MV: AtomicU32 = AtomicU32::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_pin_mv(mv: u32) {
    SIM_PIN_MV.store(mv, Ordering::Relaxed);
}

/// Pin millivolts → supply millivolts.
pub fn supply_mv(pin_mv: u32) -> u32 {
    pin_mv.saturating_mul(DIVIDER_HIGH_KOHM + DIVIDER_LOW_KOHM) / DIVIDER_LOW_KOHM
}

pub fn is_on(supply_mv: u32) -> bool {
    supply_mv > ON_THRESHOLD_MV
}

pub struct SupplyDetect {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    channel: u32,
    last_supply_mv: Option<u32>,
}

impl Default for SupplyDetect {
    fn default() -> Self {
        Self::new()
    }
}

impl SupplyDetect {
    pub fn new() -> Self {
        Self {
            channel: pins::SUPPLY_ADC_CHANNEL,
            last_supply_mv: None,
        }
    }

    pub fn detect(&mut self) -> Result<bool, SensorError> {
        let pin_mv = self.read_pin_mv()?;
        let supply = supply_mv(pin_mv);
        self.last_supply_mv = Some(supply);
        debug!("SupplyDetect: pin={}mV supply={}mV", pin_mv, supply);
        Ok(is_on(supply))
    }

    /// Supply voltage seen by the last successful [`detect`](Self::detect).
    pub fn last_supply_mv(&self) -> Option<u32> {
        self.last_supply_mv
    }

    #[cfg(target_os = "espidf")]
    fn read_pin_mv(&self) -> Result<u32, SensorError> {
        crate::drivers::hw_init::adc1_read_mv(self.channel).map_err(SensorError::AdcReadFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_pin_mv(&self) -> Result<u32, SensorError> {
        Ok(SIM_PIN_MV.load(Ordering::Relaxed))
    }
}
