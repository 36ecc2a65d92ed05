//! GPIO / peripheral pin assignments for the ESP32-C3 switch board.
//!
//! Every driver references this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Digital output driving the relay coil transistor (active HIGH).
pub const RELAY_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// Status LEDs (discrete red / green, LEDC PWM)
// ---------------------------------------------------------------------------

/// Red: service stopped.
pub const LED_RED_GPIO: i32 = 4;
/// Green: service running.
pub const LED_GREEN_GPIO: i32 = 5;

/// LEDC frequency for the status LEDs.
pub const LED_PWM_FREQ_HZ: u32 = 5_000;
/// Duty (8-bit) for a lit LED.
pub const LED_ON_DUTY: u8 = 0xFF;

// ---------------------------------------------------------------------------
// Supply-detect input (ADC1)
// ---------------------------------------------------------------------------

/// ADC1 channel 1 (GPIO 1 on ESP32-C3), fed through a 12 kΩ / 2 kΩ divider
/// from the switched supply.
pub const SUPPLY_ADC_GPIO: i32 = 1;
pub const SUPPLY_ADC_CHANNEL: u32 = 1;
