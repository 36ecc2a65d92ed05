//! Supervisory state machine: the single authority for "serving" vs "idle".
//!
//! ```text
//!            request_start()               worker settles
//!  Stopped ───────────────────▶ Starting ─────────────────▶ Serving
//!     ▲                                                        │
//!     │        worker settles               request_stop()     │
//!     └───────────────────────── Stopping ◀────────────────────┘
//! ```
//!
//! The console only *requests* a transition and blocks on a rendezvous;
//! the worker performs the settle once its current protocol step is done.
//! State lives in a critical-section mutex cell, the rendezvous is an
//! `embassy-sync` [`Signal`] carrying the state the worker settled into.

pub mod session;

use core::cell::Cell;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{info, warn};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SupervisorState {
    Stopped = 0,
    Starting = 1,
    Serving = 2,
    Stopping = 3,
}

impl SupervisorState {
    /// Stopped and Serving are settled; the other two always resolve.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Stopped | Self::Serving)
    }

    /// The transient state that leads to `self`.
    fn transient_towards(self) -> Self {
        match self {
            Self::Serving | Self::Starting => Self::Starting,
            Self::Stopped | Self::Stopping => Self::Stopping,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Serving => "running",
            Self::Stopping => "stopping",
        }
    }
}

// ---------------------------------------------------------------------------
// Request results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The worker settled into the requested state.
    Settled,
    /// Already there; nothing was requested.
    AlreadySettled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Another transition is in flight.
    Busy(SupervisorState),
    /// The worker settled somewhere else; the previous state was restored.
    Rejected { settled: SupervisorState },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy(s) => write!(f, "transition already in flight ({})", s.name()),
            Self::Rejected { settled } => write!(f, "worker settled {}", settled.name()),
        }
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

/// Shared between exactly one requester (the console) and one settler (the
/// worker).
pub struct Supervisor {
    state: Mutex<CriticalSectionRawMutex, Cell<SupervisorState>>,
    settled: Signal<CriticalSectionRawMutex, SupervisorState>,
    autostart_held: AtomicBool,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(SupervisorState::Stopped)),
            settled: Signal::new(),
            autostart_held: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state.lock(Cell::get)
    }

    pub fn is_serving(&self) -> bool {
        self.state() == SupervisorState::Serving
    }

    // ── Requester side (console) ──────────────────────────────

    /// Ask the worker to enter Serving and block until it has.
    pub fn request_start(&self) -> Result<TransitionOutcome, TransitionError> {
        self.request(SupervisorState::Serving)
    }

    /// Ask the worker to leave Serving and block until it has.
    pub fn request_stop(&self) -> Result<TransitionOutcome, TransitionError> {
        self.request(SupervisorState::Stopped)
    }

    fn request(&self, target: SupervisorState) -> Result<TransitionOutcome, TransitionError> {
        let previous = self.state.lock(|s| {
            let current = s.get();
            if current == target {
                return Ok(None);
            }
            if !current.is_settled() {
                return Err(TransitionError::Busy(current));
            }
            // Clear any stale settle before the worker can see the request.
            self.settled.reset();
            s.set(target.transient_towards());
            Ok(Some(current))
        })?;

        let Some(previous) = previous else {
            return Ok(TransitionOutcome::AlreadySettled);
        };

        info!("Supervisor: {} -> {} requested", previous.name(), target.name());
        let reached = futures_lite::future::block_on(self.settled.wait());
        if reached == target {
            info!("Supervisor: settled {}", reached.name());
            Ok(TransitionOutcome::Settled)
        } else {
            warn!(
                "Supervisor: wanted {}, worker settled {}; restoring {}",
                target.name(),
                reached.name(),
                previous.name()
            );
            self.state.lock(|s| s.set(previous));
            Err(TransitionError::Rejected { settled: reached })
        }
    }

    /// Keep [`begin_serving`](Self::begin_serving) from starting the
    /// service until the returned guard drops.  The console takes this
    /// around reconfigurations.
    pub fn hold_autostart(&self) -> AutostartHold<'_> {
        self.autostart_held.store(true, Ordering::SeqCst);
        AutostartHold { supervisor: self }
    }

    pub fn autostart_held(&self) -> bool {
        self.autostart_held.load(Ordering::SeqCst)
    }

    // ── Settler side (worker) ─────────────────────────────────

    /// A start request is waiting for the worker.
    pub fn start_requested(&self) -> bool {
        self.state() == SupervisorState::Starting
    }

    /// A stop request is waiting for the worker.
    pub fn stop_requested(&self) -> bool {
        self.state() == SupervisorState::Stopping
    }

    /// Settle into `to` and release the waiting requester.
    pub fn settle(&self, to: SupervisorState) {
        debug_assert!(to.is_settled());
        self.state.lock(|s| s.set(to));
        self.settled.signal(to);
    }

    /// Refuse a pending start: settle back into Stopped.
    pub fn reject_start(&self) {
        self.settle(SupervisorState::Stopped);
    }

    /// Enter Serving with nobody waiting (boot-time autostart).  Returns
    /// `false` unless the supervisor was Stopped with no autostart hold.
    pub fn begin_serving(&self) -> bool {
        self.state.lock(|s| {
            // Read under the state lock: a holder that stores the flag and
            // then reads the state sees either Serving or a refusal here.
            if s.get() == SupervisorState::Stopped && !self.autostart_held() {
                s.set(SupervisorState::Serving);
                true
            } else {
                false
            }
        })
    }
}

/// Returned by [`Supervisor::hold_autostart`].
pub struct AutostartHold<'a> {
    supervisor: &'a Supervisor,
}

impl Drop for AutostartHold<'_> {
    fn drop(&mut self) {
        self.supervisor.autostart_held.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
