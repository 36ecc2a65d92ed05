//! Device configuration
//!
//! Network credentials, the remote repertory locator, the private key, and
//! the small set of tunables the worker reads at session start.  Loaded once
//! at boot through a [`StoragePort`], mutated only by the console, persisted
//! back on every mutation.

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::String;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::StoragePort;
use crate::error::StorageError;

/// NVS namespace holding every persisted key below.
pub const NAMESPACE: &str = "switch";
pub const KEY_REPERTORY: &str = "repertory";
pub const KEY_PRIVKEY: &str = "privkey";
pub const KEY_WIFI_SSID: &str = "wifi_ssid";
pub const KEY_WIFI_PASS: &str = "wifi_pass";
pub const KEY_SETTINGS: &str = "settings";

pub const SSID_CAP: usize = 32;
pub const PASSWORD_CAP: usize = 64;
pub const REPERTORY_CAP: usize = 128;
pub const PRIVKEY_CAP: usize = 1024;

pub const DEFAULT_INTERVAL_SECS: u8 = 5;
pub const DEFAULT_DEVICE_ID: &str = "0000000000000001";
pub const DEFAULT_DEVICE_NAME: &str = "ESP32C3 Remote Switch";
/// China Standard Time, the zone the factory image renders clock values in.
pub const DEFAULT_TIMEZONE: &str = "CST-8";

/// Upper bound of an encoded [`Settings`] blob.
const SETTINGS_BLOB_CAP: usize = 160;

/// Postcard-encoded tunables (`switch::settings`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds between remote update checks (1..=255).
    pub interval_secs: u8,
    /// Enter Serving on boot once the network and clock are up.
    pub autostart: bool,
    pub device_id: String<32>,
    pub device_name: String<64>,
    /// POSIX TZ rule applied before SNTP starts.
    pub timezone: String<32>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut device_id = String::new();
        let _ = device_id.push_str(DEFAULT_DEVICE_ID);
        let mut device_name = String::new();
        let _ = device_name.push_str(DEFAULT_DEVICE_NAME);
        let mut timezone = String::new();
        let _ = timezone.push_str(DEFAULT_TIMEZONE);
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            autostart: true,
            device_id,
            device_name,
            timezone,
        }
    }
}

impl Settings {
    /// Interval clamped into its valid range; a stored zero would stall the
    /// tick countdown.
    pub fn interval(&self) -> u8 {
        self.interval_secs.max(1)
    }
}

/// Everything the firmware persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub wifi_ssid: String<SSID_CAP>,
    pub wifi_password: String<PASSWORD_CAP>,
    pub repository: String<REPERTORY_CAP>,
    pub private_key: String<PRIVKEY_CAP>,
    pub settings: Settings,
}

impl DeviceConfig {
    pub fn has_credentials(&self) -> bool {
        !self.wifi_ssid.is_empty()
    }

    /// Both halves of the remote identity are present.
    pub fn has_identity(&self) -> bool {
        !self.repository.is_empty() && !self.private_key.is_empty()
    }

    /// Load every key from `storage`, defaulting whatever is missing.
    pub fn load(storage: &impl StoragePort) -> Self {
        let mut cfg = Self::default();
        load_text(storage, KEY_WIFI_SSID, &mut cfg.wifi_ssid);
        load_text(storage, KEY_WIFI_PASS, &mut cfg.wifi_password);
        load_text(storage, KEY_REPERTORY, &mut cfg.repository);
        load_text(storage, KEY_PRIVKEY, &mut cfg.private_key);

        let mut buf = [0u8; SETTINGS_BLOB_CAP];
        match storage.read(NAMESPACE, KEY_SETTINGS, &mut buf) {
            Ok(n) => match postcard::from_bytes::<Settings>(&buf[..n]) {
                Ok(settings) => cfg.settings = settings,
                Err(_) => warn!("Config: settings blob corrupted, using defaults"),
            },
            Err(StorageError::NotFound) => {}
            Err(e) => warn!("Config: settings read failed ({}), using defaults", e),
        }

        info!(
            "Config: loaded (ssid='{}', repertory='{}', key={}, interval={}s)",
            cfg.wifi_ssid,
            cfg.repository,
            if cfg.private_key.is_empty() { "unset" } else { "set" },
            cfg.settings.interval(),
        );
        cfg
    }

    pub fn save_repository(&self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        storage.write(NAMESPACE, KEY_REPERTORY, self.repository.as_bytes())
    }

    pub fn save_private_key(&self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        storage.write(NAMESPACE, KEY_PRIVKEY, self.private_key.as_bytes())
    }

    pub fn save_credentials(&self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        storage.write(NAMESPACE, KEY_WIFI_SSID, self.wifi_ssid.as_bytes())?;
        storage.write(NAMESPACE, KEY_WIFI_PASS, self.wifi_password.as_bytes())
    }

    pub fn save_settings(&self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(&self.settings).map_err(|_| StorageError::Corrupted)?;
        storage.write(NAMESPACE, KEY_SETTINGS, &bytes)
    }
}

fn load_text<const N: usize>(storage: &impl StoragePort, key: &str, out: &mut String<N>) {
    let mut buf = [0u8; PRIVKEY_CAP];
    let n = match storage.read(NAMESPACE, key, &mut buf[..N]) {
        Ok(n) => n,
        Err(StorageError::NotFound) => return,
        Err(e) => {
            warn!("Config: read '{}' failed ({})", key, e);
            return;
        }
    };
    match core::str::from_utf8(&buf[..n]) {
        Ok(text) => {
            out.clear();
            let _ = out.push_str(text);
        }
        Err(_) => warn!("Config: '{}' is not UTF-8, ignoring", key),
    }
}

// ── Shared handle ─────────────────────────────────────────────

/// Config shared between the console (sole writer) and the worker (reads a
/// snapshot at each session initialisation).
pub struct SharedConfig {
    inner: Mutex<CriticalSectionRawMutex, core::cell::RefCell<DeviceConfig>>,
}

impl SharedConfig {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            inner: Mutex::new(core::cell::RefCell::new(config)),
        }
    }

    pub fn snapshot(&self) -> DeviceConfig {
        self.inner.lock(|c| c.borrow().clone())
    }

    pub fn read<R>(&self, f: impl FnOnce(&DeviceConfig) -> R) -> R {
        self.inner.lock(|c| f(&c.borrow()))
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut DeviceConfig) -> R) -> R {
        self.inner.lock(|c| f(&mut c.borrow_mut()))
    }
}
