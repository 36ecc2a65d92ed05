//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Worker / Console (domain)
//! ```
//!
//! Driven adapters (sensor, relay, status LED, storage, clock, remote sync)
//! and the console's serial transport implement these traits.  The [`Worker`](super::worker::Worker) and the
//! [`Console`](crate::console::Console) consume them via generics, so the
//! domain core never touches hardware directly.

use std::sync::Arc;

use heapless::String;

use crate::error::{ActuatorError, RemoteError, SensorError, StorageError, TransportError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Supply-detect input: is the switched load currently powered?
pub trait SensorPort {
    /// Threshold-compared calibrated reading.  `true` = ON.
    fn detect(&mut self) -> Result<bool, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Relay output.
pub trait ActuatorPort {
    /// Drive the relay high for `duration_ms`, then low again.  Blocks for
    /// the full pulse.
    fn pulse(&mut self, duration_ms: u32) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Indicator port (status LED)
// ───────────────────────────────────────────────────────────────

pub trait IndicatorPort {
    /// Service stopped (red).
    fn show_idle(&mut self);
    /// Service running (green).
    fn show_serving(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The worker emits structured [`ServiceEvent`](super::events::ServiceEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::ServiceEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// Keys are namespaced; the firmware uses a single `switch` namespace.
/// Writes MUST be atomic, which the ESP-IDF NVS API guarantees natively.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Console transport (driving adapter: operator ↔ console)
// ───────────────────────────────────────────────────────────────

/// Byte-in / byte-out duplex stream behind the console.
pub trait ConsoleTransport {
    /// Block until one byte arrives.
    fn read_byte(&mut self) -> Result<u8, TransportError>;

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// System + clock ports
// ───────────────────────────────────────────────────────────────

pub trait SystemPort {
    /// Current free heap in bytes.
    fn free_heap(&self) -> u32;

    /// Full device restart.  Does not return on hardware.
    fn restart(&mut self);
}

pub trait ClockPort {
    /// Milliseconds since boot (monotonic).
    fn uptime_ms(&self) -> u64;

    /// Wall clock has been set by the time-sync client.
    fn is_synced(&self) -> bool;

    /// `YYYY/MM/DD hh:mm:ss`, or `None` before sync.
    fn wall_clock(&self) -> Option<String<32>>;
}

// ───────────────────────────────────────────────────────────────
// Remote sync primitive (opaque collaborator)
// ───────────────────────────────────────────────────────────────

/// Who we are to the remote.
#[derive(Debug, Clone, Copy)]
pub struct RemoteIdentity<'a> {
    pub repository: &'a str,
    pub private_key: &'a str,
    pub device_id: &'a str,
    pub device_name: &'a str,
}

/// Receives free-text payloads pushed by the remote during
/// [`RemoteSync::check_for_update`].  May be called from any task.
pub trait RemoteEventHandler: Send + Sync {
    fn on_remote_event(&self, text: &str);
}

/// init / check-for-update / commit.  The protocol itself lives behind
/// this trait.
pub trait RemoteSync {
    fn init(
        &mut self,
        identity: &RemoteIdentity<'_>,
        handler: Arc<dyn RemoteEventHandler>,
    ) -> Result<(), RemoteError>;

    fn check_for_update(&mut self) -> Result<(), RemoteError>;

    fn commit(&mut self, event: &str) -> Result<(), RemoteError>;
}
