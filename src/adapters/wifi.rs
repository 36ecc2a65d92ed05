//! WiFi station-mode connection manager.
//!
//! Owns association with the access point.  `connect()` blocks the caller
//! until the link layer reports either an address or exhaustion of the
//! retry bound; `available()` is a non-blocking query any task may poll.
//! The state machine itself ([`LinkStatus::on_event`]) is pure; the
//! manager wraps it in a critical-section cell and drives a [`LinkDriver`].
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`EspLinkDriver`] over `esp_idf_svc::wifi`,
//!   with link events delivered by system event-loop subscriptions.
//! - **all other targets**: tests supply their own [`LinkDriver`] and feed
//!   [`LinkEvent`]s by hand.
//!
//! ## Retry policy
//!
//! An explicit `connect()` starts counting link losses at 0 and gives up
//! (Failed) on the loss that finds the counter at [`MAX_RETRIES`].  After a
//! successful association the counter is parked at a sentinel (-1) so that
//! opportunistic reconnection after a later link loss retries forever.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{info, warn};

use crate::error::ConnectivityError;

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Associated,
    Failed,
}

/// Asynchronous link-layer notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Station interface started.
    Started,
    /// Association lost (or never completed).
    Lost,
    /// DHCP handed us an address.
    AddressAcquired,
}

/// What the manager must do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    None,
    /// Ask the driver to (re-)associate.
    Associate,
    /// Wake a waiting `connect()` with success.
    Associated,
    /// Wake a waiting `connect()` with failure.
    Failed,
}

/// Explicit connects give up on the loss that finds this many retries.
pub const MAX_RETRIES: i8 = 5;

/// Retry counter value that suppresses counting.
pub const NOT_COUNTING: i8 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: ConnectionState,
    pub retries: i8,
}

impl LinkStatus {
    pub const INITIAL: Self = Self {
        state: ConnectionState::Disconnected,
        retries: NOT_COUNTING,
    };

    /// Fresh explicit connect request.
    pub const CONNECTING: Self = Self {
        state: ConnectionState::Connecting,
        retries: 0,
    };

    /// Pure transition function.
    pub fn on_event(self, event: LinkEvent) -> (Self, Reaction) {
        match event {
            LinkEvent::Started => (
                Self {
                    state: ConnectionState::Connecting,
                    ..self
                },
                Reaction::Associate,
            ),
            LinkEvent::Lost if self.retries < MAX_RETRIES => {
                let retries = if self.retries >= 0 {
                    self.retries + 1
                } else {
                    self.retries
                };
                (
                    Self {
                        state: ConnectionState::Connecting,
                        retries,
                    },
                    Reaction::Associate,
                )
            }
            LinkEvent::Lost => (
                Self {
                    state: ConnectionState::Failed,
                    ..self
                },
                Reaction::Failed,
            ),
            LinkEvent::AddressAcquired => (
                Self {
                    state: ConnectionState::Associated,
                    retries: NOT_COUNTING,
                },
                Reaction::Associated,
            ),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Driver seam
// ───────────────────────────────────────────────────────────────

/// The link layer underneath the manager.
pub trait LinkDriver: Send {
    /// Apply credentials and bring the station up.  Progress is reported
    /// later through [`LinkEvent`]s.
    fn link_up(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;

    /// Request (re-)association with the configured AP.
    fn associate(&mut self) -> Result<(), ConnectivityError>;
}

// ───────────────────────────────────────────────────────────────
// Connection manager
// ───────────────────────────────────────────────────────────────

pub struct ConnectionManager<D> {
    driver: std::sync::Mutex<D>,
    status: Mutex<CriticalSectionRawMutex, Cell<LinkStatus>>,
    outcome: Signal<CriticalSectionRawMutex, Result<(), ConnectivityError>>,
}

impl<D: LinkDriver> ConnectionManager<D> {
    /// Wrap an already-initialised driver.
    pub fn new(driver: D) -> Self {
        Self {
            driver: std::sync::Mutex::new(driver),
            status: Mutex::new(Cell::new(LinkStatus::INITIAL)),
            outcome: Signal::new(),
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status.lock(Cell::get)
    }

    pub fn state(&self) -> ConnectionState {
        self.status().state
    }

    /// Non-blocking: last known association state.
    pub fn available(&self) -> bool {
        self.state() == ConnectionState::Associated
    }

    /// Join `ssid` and block until associated or failed.  No timeout beyond
    /// what the link layer imposes.  Overlapping calls are not supported.
    pub fn connect(&self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;

        info!("WiFi: connecting to '{}'", ssid);
        self.outcome.reset();
        self.status.lock(|s| s.set(LinkStatus::CONNECTING));

        if let Err(e) = self.with_driver(|d| d.link_up(ssid, password)) {
            warn!("WiFi: link-up rejected: {}", e);
            self.status.lock(|s| {
                s.set(LinkStatus {
                    state: ConnectionState::Failed,
                    ..s.get()
                });
            });
            return Err(e);
        }

        let result = futures_lite::future::block_on(self.outcome.wait());
        match result {
            Ok(()) => info!("WiFi: connected to '{}'", ssid),
            Err(e) => warn!("WiFi: failed to connect to '{}': {}", ssid, e),
        }
        result
    }

    /// Feed one link-layer event.  Called from the event-loop task.
    pub fn handle_event(&self, event: LinkEvent) -> Reaction {
        let (before, reaction) = self.status.lock(|s| {
            let before = s.get();
            let (next, reaction) = before.on_event(event);
            s.set(next);
            (before, reaction)
        });

        match reaction {
            Reaction::None => {}
            Reaction::Associate => {
                if event == LinkEvent::Lost {
                    info!("WiFi: link lost, retrying (retries={})", before.retries);
                }
                if let Err(e) = self.with_driver(|d| d.associate()) {
                    warn!("WiFi: associate request failed: {}", e);
                }
            }
            Reaction::Associated => {
                info!("WiFi: address acquired");
                self.outcome.signal(Ok(()));
            }
            Reaction::Failed => {
                warn!("WiFi: giving up after {} retries", before.retries);
                self.outcome.signal(Err(ConnectivityError::AssociationFailed));
            }
        }
        reaction
    }

    fn with_driver<T>(
        &self,
        f: impl FnOnce(&mut D) -> Result<T, ConnectivityError>,
    ) -> Result<T, ConnectivityError> {
        let mut driver = self
            .driver
            .lock()
            .map_err(|_| ConnectivityError::DriverPoisoned)?;
        f(&mut driver)
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF driver
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::{EspLinkDriver, subscribe_link_events};

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::netif::IpEvent;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::EspError;
    use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent};
    use log::info;

    use super::{ConnectionManager, LinkDriver, LinkEvent};
    use crate::error::ConnectivityError;

    fn driver_err(e: EspError) -> ConnectivityError {
        ConnectivityError::Driver(e.code())
    }

    pub struct EspLinkDriver {
        wifi: EspWifi<'static>,
    }

    impl EspLinkDriver {
        /// Bring up netif + the WiFi driver in station mode.  Fatal on error.
        pub fn new(
            modem: Modem,
            sysloop: EspSystemEventLoop,
            nvs: Option<EspDefaultNvsPartition>,
        ) -> Result<Self, EspError> {
            let wifi = EspWifi::new(modem, sysloop, nvs)?;
            info!("WiFi(espidf): driver initialised");
            Ok(Self { wifi })
        }
    }

    impl LinkDriver for EspLinkDriver {
        fn link_up(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
            if self.wifi.is_started().map_err(driver_err)? {
                self.wifi.stop().map_err(driver_err)?;
            }
            let auth_method = if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            self.wifi
                .set_configuration(&Configuration::Client(ClientConfiguration {
                    ssid: ssid.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
                    password: password
                        .try_into()
                        .map_err(|_| ConnectivityError::InvalidPassword)?,
                    auth_method,
                    ..Default::default()
                }))
                .map_err(driver_err)?;
            // STA_START arrives as LinkEvent::Started and triggers associate().
            self.wifi.start().map_err(driver_err)
        }

        fn associate(&mut self) -> Result<(), ConnectivityError> {
            self.wifi.connect().map_err(driver_err)
        }
    }

    /// Route system event-loop notifications into `manager`.  Keep both
    /// subscriptions alive for as long as events should be delivered.
    pub fn subscribe_link_events(
        sysloop: &EspSystemEventLoop,
        manager: &'static ConnectionManager<EspLinkDriver>,
    ) -> Result<(EspSubscription<'static, System>, EspSubscription<'static, System>), EspError> {
        let wifi_sub = sysloop.subscribe::<WifiEvent, _>(move |event| match event {
            WifiEvent::StaStarted { .. } => {
                manager.handle_event(LinkEvent::Started);
            }
            WifiEvent::StaDisconnected { .. } => {
                manager.handle_event(LinkEvent::Lost);
            }
            _ => {}
        })?;
        let ip_sub = sysloop.subscribe::<IpEvent, _>(move |event| {
            if let IpEvent::DhcpIpAssigned { .. } = event {
                manager.handle_event(LinkEvent::AddressAcquired);
            }
        })?;
        Ok((wifi_sub, ip_sub))
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
