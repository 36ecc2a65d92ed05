//! Outbound service events.
//!
//! The [`Worker`](super::worker::Worker) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log in production, a vector in
//! tests).

use crate::error::{ActuatorError, RemoteError, SensorError};

use super::commands::PendingResponse;

/// Structured events emitted by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// Entered Serving with the given polling interval.
    Started { interval_secs: u8 },

    /// Left Serving.
    Stopped,

    /// Remote session initialised (after `failures` failed attempts).
    SessionEstablished { failures: u32 },

    /// Remote initialisation failed; will retry after a short delay.
    InitRetry { failures: u32, error: RemoteError },

    /// A mid-session update check failed; the session is re-initialised.
    Resync { error: RemoteError },

    /// A pending remote command is being answered.
    CommandTaken(PendingResponse),

    /// An event was committed to the remote.
    Committed(&'static str),

    /// Committing an event failed; not retried within the tick.
    CommitFailed { event: &'static str, error: RemoteError },

    SenseFailed(SensorError),

    PulseFailed(ActuatorError),

    /// Free heap after answering a remote command.
    Heap(u32),
}
