//! Worker loop: answers remote commands while the supervisor is Serving.
//!
//! ```text
//!  RemoteSync ──check──▶ Mailbox ──take──▶ Worker ──▶ SensorPort / ActuatorPort
//!       ▲                                    │
//!       └──────────────commit────────────────┘
//! ```
//!
//! Runs as its own task.  Every suspension is a 1 s delay (or the relay
//! pulse), so a stop request is observed within a second whatever the
//! configured polling interval.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::adapters::wifi::LinkDriver;
use crate::config::DeviceConfig;
use crate::error::RemoteError;
use crate::fsm::session::{RemoteSession, SessionPhase};
use crate::fsm::SupervisorState;

use super::commands::{PendingResponse, reply};
use super::events::ServiceEvent;
use super::plane::ControlPlane;
use super::ports::{
    ActuatorPort, ClockPort, EventSink, IndicatorPort, RemoteIdentity, RemoteSync, SensorPort,
    SystemPort,
};

/// Relay pulse length for a remote press.
pub const PULSE_MS: u32 = 2_000;
/// Granularity of every wait in the loop.
pub const POLL_MS: u32 = 1_000;
/// Delay between failed remote initialisations.
pub const INIT_RETRY_MS: u32 = 1_000;
/// Boot-time clock sync: this many polls...
pub const CLOCK_SYNC_POLLS: u32 = 120;
/// ...this far apart.
pub const CLOCK_SYNC_POLL_MS: u32 = 2_000;

fn identity(config: &DeviceConfig) -> RemoteIdentity<'_> {
    RemoteIdentity {
        repository: config.repository.as_str(),
        private_key: config.private_key.as_str(),
        device_id: config.settings.device_id.as_str(),
        device_name: config.settings.device_name.as_str(),
    }
}

pub struct Worker<'a, L, R, H, D, S, Y> {
    plane: &'a ControlPlane<L>,
    remote: R,
    hw: H,
    delay: D,
    sink: S,
    system: Y,
    session: RemoteSession,
}

impl<'a, L, R, H, D, S, Y> Worker<'a, L, R, H, D, S, Y>
where
    L: LinkDriver,
    R: RemoteSync,
    H: SensorPort + ActuatorPort + IndicatorPort,
    D: DelayNs,
    S: EventSink,
    Y: SystemPort,
{
    pub fn new(plane: &'a ControlPlane<L>, remote: R, hw: H, delay: D, sink: S, system: Y) -> Self {
        Self {
            plane,
            remote,
            hw,
            delay,
            sink,
            system,
            session: RemoteSession::new(),
        }
    }

    pub fn session(&self) -> &RemoteSession {
        &self.session
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot phase, then serve forever.
    pub fn run(&mut self, clock: &impl ClockPort) -> ! {
        self.boot(clock);
        loop {
            self.step();
        }
    }

    /// Wait for the network and the wall clock, then autostart if
    /// configured.  Returns early if the console has already asked for a
    /// transition.
    pub fn boot(&mut self, clock: &impl ClockPort) {
        self.hw.show_idle();

        let autostart = self
            .plane
            .config
            .read(|c| c.settings.autostart && c.has_identity());
        if !autostart {
            info!("Worker: autostart disabled or identity incomplete, idling");
            return;
        }

        info!("Worker: wait wifi available...");
        while !self.plane.wifi.available() {
            if self.console_intervened() {
                return;
            }
            self.delay.delay_ms(POLL_MS);
        }
        info!("Worker: wifi available");

        for attempt in 1..=CLOCK_SYNC_POLLS {
            if clock.is_synced() || self.console_intervened() {
                break;
            }
            info!(
                "Worker: waiting for system time to be set... ({}/{})",
                attempt, CLOCK_SYNC_POLLS
            );
            self.delay.delay_ms(CLOCK_SYNC_POLL_MS);
        }
        if !clock.is_synced() {
            warn!("Worker: wall clock not synchronised, continuing anyway");
        }

        // A console reconfiguration in progress holds autostart off; start
        // once it is done so the first session sees the new config.
        loop {
            if self.plane.supervisor.begin_serving() {
                info!("Worker: autostart");
                return;
            }
            if self.console_intervened() {
                return;
            }
            debug!("Worker: autostart held by console");
            self.delay.delay_ms(POLL_MS);
        }
    }

    fn console_intervened(&self) -> bool {
        self.plane.supervisor.state() != SupervisorState::Stopped
    }

    /// One pass of the outer state machine.
    pub fn step(&mut self) {
        let supervisor = &self.plane.supervisor;
        match supervisor.state() {
            SupervisorState::Stopped => self.delay.delay_ms(POLL_MS),
            SupervisorState::Starting => {
                if !self.plane.config.read(DeviceConfig::has_identity) {
                    warn!("Worker: repertory or private key missing, start refused");
                    supervisor.reject_start();
                    return;
                }
                supervisor.settle(SupervisorState::Serving);
                self.serve();
            }
            SupervisorState::Serving => self.serve(),
            SupervisorState::Stopping => supervisor.settle(SupervisorState::Stopped),
        }
    }

    // ── Serving ───────────────────────────────────────────────

    /// Runs until the supervisor leaves Serving, then settles Stopped.
    fn serve(&mut self) {
        let mut interval = self.plane.config.read(|c| c.settings.interval());
        let mut countdown: u8 = 0;

        self.hw.show_serving();
        self.sink.emit(&ServiceEvent::Started {
            interval_secs: interval,
        });
        self.session.reset();
        // Anything left from a previous session is stale.
        self.plane.mailbox.take();

        while self.plane.supervisor.is_serving() {
            match self.session.phase() {
                SessionPhase::Uninitialized => {
                    if self.plane.wifi.available() {
                        self.session.begin();
                    } else {
                        self.delay.delay_ms(POLL_MS);
                    }
                }
                SessionPhase::Initializing => {
                    if !self.plane.wifi.available() {
                        self.delay.delay_ms(POLL_MS);
                        continue;
                    }
                    let config = self.plane.config.snapshot();
                    interval = config.settings.interval();
                    match self
                        .remote
                        .init(&identity(&config), self.plane.mailbox.clone())
                    {
                        Ok(()) => {
                            let failures = self.session.init_failures();
                            self.session.init_succeeded();
                            self.sink
                                .emit(&ServiceEvent::SessionEstablished { failures });
                            countdown = 0;
                        }
                        Err(error) => {
                            let failures = self.session.init_failed();
                            self.sink.emit(&ServiceEvent::InitRetry { failures, error });
                            self.delay.delay_ms(INIT_RETRY_MS);
                        }
                    }
                }
                SessionPhase::Active => {
                    if countdown == 0 {
                        if let Err(error) = self.tick() {
                            self.session.check_failed();
                            self.sink.emit(&ServiceEvent::Resync { error });
                            continue;
                        }
                    }
                    self.delay.delay_ms(POLL_MS);
                    countdown = (countdown + 1) % interval;
                }
            }
        }

        self.session.reset();
        self.hw.show_idle();
        self.sink.emit(&ServiceEvent::Stopped);
        if self.plane.supervisor.stop_requested() {
            self.plane.supervisor.settle(SupervisorState::Stopped);
        }
    }

    /// Check for an update and answer whatever command it left behind.
    /// Only the update check itself is an error; sensor, relay and commit
    /// failures are reported and dropped.
    pub fn tick(&mut self) -> Result<(), RemoteError> {
        self.remote.check_for_update()?;

        let pending = self.plane.mailbox.take();
        match pending {
            PendingResponse::None => return Ok(()),
            PendingResponse::ReportState => {
                self.sink.emit(&ServiceEvent::CommandTaken(pending));
                match self.hw.detect() {
                    Ok(on) => {
                        debug!("Worker: detect state {}", if on { "ON" } else { "OFF" });
                        self.commit(if on { reply::ON } else { reply::OFF });
                    }
                    Err(e) => self.sink.emit(&ServiceEvent::SenseFailed(e)),
                }
            }
            PendingResponse::SwitchPress => {
                self.sink.emit(&ServiceEvent::CommandTaken(pending));
                match self.hw.pulse(PULSE_MS) {
                    Ok(()) => self.commit(reply::DONE),
                    Err(e) => self.sink.emit(&ServiceEvent::PulseFailed(e)),
                }
            }
        }

        self.sink.emit(&ServiceEvent::Heap(self.system.free_heap()));
        Ok(())
    }

    fn commit(&mut self, event: &'static str) {
        match self.remote.commit(event) {
            Ok(()) => self.sink.emit(&ServiceEvent::Committed(event)),
            Err(error) => self.sink.emit(&ServiceEvent::CommitFailed { event, error }),
        }
    }
}
