//! Unified error types for the remote-switch firmware.
//!
//! One small `Copy` enum per concern, each convertible into the top-level
//! [`Error`].  Port traits return the concern-specific type; boot code and
//! `main` funnel everything into [`Error`] (and from there into `anyhow`).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The supply-detect sensor could not be read.
    Sensor(SensorError),
    /// The relay could not be driven.
    Actuator(ActuatorError),
    /// WiFi association or driver failure.
    Connectivity(ConnectivityError),
    /// The remote sync primitive reported a failure.
    Remote(RemoteError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// The console byte stream failed.
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Connectivity(e) => write!(f, "wifi: {e}"),
            Self::Remote(e) => write!(f, "remote: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Transport(e) => write!(f, "console: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error code.
    AdcReadFailed(i32),
    /// ADC has no calibration scheme, millivolts are unavailable.
    NotCalibrated,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed(rc) => write!(f, "ADC read failed (rc={rc})"),
            Self::NotCalibrated => write!(f, "ADC not calibrated"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed(i32),
    /// Pulse length zero or above the relay limit.
    InvalidDuration,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed(rc) => write!(f, "GPIO write failed (rc={rc})"),
            Self::InvalidDuration => write!(f, "pulse duration out of range"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Connectivity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    /// SSID empty, too long, or not printable ASCII.
    InvalidSsid,
    /// Password too long for the driver.
    InvalidPassword,
    /// The link layer gave up after exhausting the retry bound.
    AssociationFailed,
    /// The WiFi driver rejected a request (ESP-IDF error code).
    Driver(i32),
    /// Another task panicked while holding the driver.
    DriverPoisoned,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (at most 64 bytes)"),
            Self::AssociationFailed => write!(f, "association failed"),
            Self::Driver(rc) => write!(f, "driver error (rc={rc})"),
            Self::DriverPoisoned => write!(f, "driver lock poisoned"),
        }
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

// ---------------------------------------------------------------------------
// Remote sync errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteError {
    /// Repository locator or private key missing / malformed.
    BadIdentity,
    /// Network transport failed mid-operation.
    Transport,
    /// The remote rejected our credentials.
    Auth,
    /// Protocol-level failure with the library's own error number.
    Protocol(i32),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadIdentity => write!(f, "bad identity (repertory / private key)"),
            Self::Transport => write!(f, "transport failure"),
            Self::Auth => write!(f, "authentication rejected"),
            Self::Protocol(n) => write!(f, "protocol error {n}"),
        }
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors from [`StoragePort`](crate::app::ports::StoragePort) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Stored blob failed to decode.
    Corrupted,
    /// Generic I/O error with the backend's code.
    Io(i32),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::Corrupted => write!(f, "stored value corrupted"),
            Self::Io(rc) => write!(f, "I/O error (rc={rc})"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Console transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The driver returned something other than exactly one byte.
    ReadFailed,
    /// The driver refused the write.
    WriteFailed,
    /// The stream is closed and will never produce more input.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::Closed => write!(f, "stream closed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}
