//! Console transport over the ESP32-C3 built-in USB-Serial/JTAG port.
//!
//! Implements [`ConsoleTransport`]:
//!
//! - **`target_os = "espidf"`**: installs the USB-Serial/JTAG driver and
//!   blocks in `usb_serial_jtag_read_bytes()` for each byte.  Every write
//!   ends the current USB packet so prompts and echoes reach the host
//!   without waiting for the FIFO to fill.
//! - **`not(target_os = "espidf")`**: stdin / stdout, for running the
//!   console on a workstation.

use crate::app::ports::ConsoleTransport;
use crate::error::TransportError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::{error, info};

/// Driver ring buffer sizes, bytes.
pub const RX_BUFFER: u32 = 256;
pub const TX_BUFFER: u32 = 256;

/// Back-off after a failed read so a wedged driver cannot spin the task.
pub const READ_RETRY_MS: u32 = 1_000;

/// `USB_SERIAL_JTAG_EP1_CONF_REG` on the ESP32-C3.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const EP1_CONF_REG: usize = 0x6004_3000 + 0x4;
/// `USB_SERIAL_JTAG_WR_DONE`: hand the buffered IN bytes to the host.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const EP1_WR_DONE: u32 = 1 << 0;

#[cfg(target_os = "espidf")]
fn flush_tx_fifo() {
    // SAFETY: fixed, always-mapped peripheral register; WR_DONE is a
    // write-one-to-trigger bit with no effect on the other fields.
    unsafe { core::ptr::write_volatile(EP1_CONF_REG as *mut u32, EP1_WR_DONE) };
}

pub struct UsbSerialTransport {
    _private: (),
}

impl UsbSerialTransport {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, TransportError> {
        let mut cfg = usb_serial_jtag_driver_config_t {
            tx_buffer_size: TX_BUFFER,
            rx_buffer_size: RX_BUFFER,
        };
        // SAFETY: installed once from main() before the console task starts.
        let ret = unsafe { usb_serial_jtag_driver_install(&mut cfg) };
        if ret != ESP_OK as i32 {
            error!("Serial: USB-Serial/JTAG driver install failed (rc={})", ret);
            return Err(TransportError::Closed);
        }
        info!("Serial: USB-Serial/JTAG driver installed");
        Ok(Self { _private: () })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self { _private: () })
    }
}

#[cfg(target_os = "espidf")]
impl ConsoleTransport for UsbSerialTransport {
    fn read_byte(&mut self) -> Result<u8, TransportError> {
        let mut byte = 0u8;
        let n = unsafe {
            usb_serial_jtag_read_bytes(
                (&mut byte as *mut u8).cast(),
                1,
                esp_idf_hal::delay::BLOCK,
            )
        };
        if n == 1 {
            return Ok(byte);
        }
        esp_idf_hal::delay::FreeRtos::delay_ms(READ_RETRY_MS);
        Err(TransportError::ReadFailed)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let n = unsafe {
            usb_serial_jtag_write_bytes(data.as_ptr().cast(), data.len(), esp_idf_hal::delay::BLOCK)
        };
        if n < 0 || n as usize != data.len() {
            return Err(TransportError::WriteFailed);
        }
        flush_tx_fifo();
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl ConsoleTransport for UsbSerialTransport {
    fn read_byte(&mut self) -> Result<u8, TransportError> {
        use std::io::Read;

        let mut byte = [0u8; 1];
        match std::io::stdin().read(&mut byte) {
            Ok(0) => Err(TransportError::Closed),
            // Terminals send LF; the console speaks CR.
            Ok(_) if byte[0] == b'\n' => Ok(b'\r'),
            Ok(_) => Ok(byte[0]),
            Err(_) => Err(TransportError::ReadFailed),
        }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        use std::io::Write;

        let mut out = std::io::stdout().lock();
        out.write_all(data)
            .and_then(|()| out.flush())
            .map_err(|_| TransportError::WriteFailed)
    }
}
