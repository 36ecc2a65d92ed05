//! Sensor drivers.

pub mod supply_detect;

pub use supply_detect::SupplyDetect;
