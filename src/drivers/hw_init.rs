//! One-shot hardware peripheral initialization.
//!
//! Configures the supply-detect ADC channel (with curve-fitting
//! calibration), the relay GPIO, and the LEDC timer/channels for the
//! status LEDs using raw ESP-IDF sys calls.  Called once from `main()`
//! before the tasks are spawned.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    AdcCalibrationFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc)        => write!(f, "ADC1 init failed (rc={})", rc),
            Self::AdcCalibrationFailed(rc) => write!(f, "ADC1 calibration scheme failed (rc={})", rc),
            Self::GpioConfigFailed(rc)     => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc)       => write!(f, "LEDC timer/channel config failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before any task is spawned.
    unsafe {
        init_adc()?;
        init_gpio_outputs()?;
        init_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot + calibration) ───────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut ADC1_CALI: adc_cali_handle_t = core::ptr::null_mut();
/// The worker and the console both sample the supply detect channel.
#[cfg(target_os = "espidf")]
static ADC1_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_DEFAULT,
    };
    let ret = unsafe { adc_oneshot_config_channel(ADC1_HANDLE, pins::SUPPLY_ADC_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    let cali_cfg = adc_cali_curve_fitting_config_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        chan: pins::SUPPLY_ADC_CHANNEL,
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_DEFAULT,
    };
    // SAFETY: ADC1_CALI is only written here, once at boot.
    let ret = unsafe { adc_cali_create_scheme_curve_fitting(&cali_cfg, &raw mut ADC1_CALI) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcCalibrationFailed(ret)); }

    info!("hw_init: ADC1 configured (CH{}=supply detect, curve fitting)", pins::SUPPLY_ADC_CHANNEL);
    Ok(())
}

/// Calibrated millivolts at the ADC pin.
#[cfg(target_os = "espidf")]
pub fn adc1_read_mv(channel: u32) -> Result<u32, i32> {
    let _guard = ADC1_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let mut raw: i32 = 0;
    // SAFETY: both handles are written once in init_adc() before any task
    // exists; reads are serialised by ADC1_LOCK.
    let ret = unsafe { adc_oneshot_read(ADC1_HANDLE, channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(ret);
    }
    let mut mv: i32 = 0;
    let ret = unsafe { adc_cali_raw_to_voltage(ADC1_CALI, raw, &mut mv) };
    if ret != ESP_OK as i32 {
        return Err(ret);
    }
    Ok(mv.max(0) as u32)
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::RELAY_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    unsafe { gpio_set_level(pins::RELAY_GPIO, 0) };

    info!("hw_init: relay GPIO{} configured", pins::RELAY_GPIO);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), i32> {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret != ESP_OK as i32 {
        return Err(ret);
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) -> Result<(), i32> {
    Ok(())
}

// ── LEDC PWM ─────────────────────────────────────────────────

pub const LEDC_CH_LED_RED: u32 = 0;
pub const LEDC_CH_LED_GREEN: u32 = 1;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::LED_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: called from the single main-task context via init_peripherals().
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }

    let leds = [
        (LEDC_CH_LED_RED, pins::LED_RED_GPIO),
        (LEDC_CH_LED_GREEN, pins::LED_GREEN_GPIO),
    ];
    for (channel, gpio) in leds {
        let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: gpio,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        }) };
        if ret != ESP_OK as i32 { return Err(HwInitError::LedcInitFailed(ret)); }
    }

    info!("hw_init: LEDC configured (red=CH0, green=CH1)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: LEDC channels were configured in init_ledc(); only the worker
    // task drives the indicator afterwards.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty as u32);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) {}
