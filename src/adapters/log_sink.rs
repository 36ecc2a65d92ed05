//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing worker events to the ESP-IDF logger
//! (USB-serial in production).

use log::{info, warn};

use crate::app::events::ServiceEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ServiceEvent`] to the serial console.
pub struct LogEventSink;

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ServiceEvent) {
        match event {
            ServiceEvent::Started { interval_secs } => {
                info!("SERVE | started, interval={}s", interval_secs);
            }
            ServiceEvent::Stopped => info!("SERVE | stopped"),
            ServiceEvent::SessionEstablished { failures } => {
                info!("SYNC  | session established after {} failed attempt(s)", failures);
            }
            ServiceEvent::InitRetry { failures, error } => {
                warn!("SYNC  | init failed ({}), attempt {}, retrying", error, failures);
            }
            ServiceEvent::Resync { error } => {
                warn!("SYNC  | update check failed ({}), re-initialising", error);
            }
            ServiceEvent::CommandTaken(cmd) => info!("CMD   | {:?}", cmd),
            ServiceEvent::Committed(text) => info!("CMD   | committed '{}'", text),
            ServiceEvent::CommitFailed { event, error } => {
                warn!("CMD   | commit '{}' failed ({})", event, error);
            }
            ServiceEvent::SenseFailed(e) => warn!("HW    | detect failed: {}", e),
            ServiceEvent::PulseFailed(e) => warn!("HW    | pulse failed: {}", e),
            ServiceEvent::Heap(bytes) => info!("HEAP  | free={} bytes", bytes),
        }
    }
}
