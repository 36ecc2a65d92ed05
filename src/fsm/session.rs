//! Remote session lifecycle inside Serving.
//!
//! ```text
//!  Uninitialized ──begin──▶ Initializing ──init ok──▶ Active
//!                             ▲    │                    │
//!                             └────┘ init failed        │ check failed
//!                             ▲                         │
//!                             └─────────────────────────┘
//! ```
//!
//! Two recovery tiers: a failed initialisation retries initialisation; a
//! failed update check mid-session forces a fresh initialisation.  The
//! counters let both tiers be observed independently.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteSession {
    phase: SessionPhase,
    /// Failed initialisations since the last success.
    init_failures: u32,
    /// Mid-session failures since Serving was entered.
    resyncs: u32,
}

impl Default for RemoteSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteSession {
    pub const fn new() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            init_failures: 0,
            resyncs: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn init_failures(&self) -> u32 {
        self.init_failures
    }

    pub fn resyncs(&self) -> u32 {
        self.resyncs
    }

    /// Network is up; start initialising.
    pub fn begin(&mut self) {
        if self.phase == SessionPhase::Uninitialized {
            self.phase = SessionPhase::Initializing;
        }
    }

    pub fn init_succeeded(&mut self) {
        debug_assert_eq!(self.phase, SessionPhase::Initializing);
        self.phase = SessionPhase::Active;
        self.init_failures = 0;
    }

    /// Stay in Initializing; the caller delays and retries.
    pub fn init_failed(&mut self) -> u32 {
        self.init_failures = self.init_failures.saturating_add(1);
        self.init_failures
    }

    /// An update check failed mid-session: drop back to Initializing.
    pub fn check_failed(&mut self) -> u32 {
        debug_assert_eq!(self.phase, SessionPhase::Active);
        self.phase = SessionPhase::Initializing;
        self.resyncs = self.resyncs.saturating_add(1);
        self.resyncs
    }

    /// Leaving Serving.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
