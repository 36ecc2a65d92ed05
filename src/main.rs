//! Remote Switch Firmware: Main Entry Point
//!
//! Two tasks share one [`ControlPlane`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  HardwareAdapter       LogEventSink   NvsAdapter   EspClock  │
//! │  (Sensor+Actuator+LED) (EventSink)    (Storage)    (Clock)   │
//! │  EspLinkDriver         OfflineRemote  UsbSerialTransport     │
//! │  (WiFi STA)            (RemoteSync)   (Console transport)    │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │   console task ──request──▶ Supervisor ◀──settle── worker    │
//! │        │                      Mailbox  ◀──remote── worker    │
//! │        └──connect──▶ ConnectionManager ◀──events── sysloop   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::{Result, anyhow};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use log::{error, info, warn};

use remote_switch::adapters::hardware::HardwareAdapter;
use remote_switch::adapters::log_sink::LogEventSink;
use remote_switch::adapters::nvs::NvsAdapter;
use remote_switch::adapters::remote::OfflineRemote;
use remote_switch::adapters::serial::UsbSerialTransport;
use remote_switch::adapters::system::EspSystem;
use remote_switch::adapters::time::{self, EspClock};
use remote_switch::adapters::wifi::{EspLinkDriver, subscribe_link_events};
use remote_switch::app::plane::ControlPlane;
use remote_switch::app::worker::Worker;
use remote_switch::config::{DEFAULT_TIMEZONE, DeviceConfig};
use remote_switch::console::Console;
use remote_switch::drivers::hw_init;
use remote_switch::drivers::relay::Relay;
use remote_switch::drivers::status_led::StatusLed;
use remote_switch::drivers::task_pin::{TaskSpec, spawn_task};
use remote_switch::sensors::SupplyDetect;

// ── Task layout ───────────────────────────────────────────────

const WORKER_TASK: TaskSpec = TaskSpec { name: "worker\0", priority: 5, stack_kb: 8 };
const CONSOLE_TASK: TaskSpec = TaskSpec { name: "console\0", priority: 4, stack_kb: 8 };

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Remote Switch v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().map_err(|e| anyhow!("peripheral init failed: {e}"))?;

    // ── 3. Configuration ──────────────────────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {e}"))?;
    let config = DeviceConfig::load(&nvs);
    if !time::set_timezone(&config.settings.timezone) {
        time::set_timezone(DEFAULT_TIMEZONE);
    }

    // ── 4. WiFi driver + shared control plane ─────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let link = EspLinkDriver::new(peripherals.modem, sysloop.clone(), Some(nvs_partition))?;

    let plane: &'static ControlPlane<EspLinkDriver> =
        Box::leak(Box::new(ControlPlane::new(config, link)));
    let _link_events = subscribe_link_events(&sysloop, &plane.wifi)?;

    // SNTP runs in the background; the worker waits on it through EspClock.
    let _sntp = EspSntp::new_default()?;

    let serial = UsbSerialTransport::new().map_err(|e| anyhow!("console transport: {e}"))?;

    // ── 5. Tasks ──────────────────────────────────────────────
    spawn_task(WORKER_TASK, move || {
        let hw = HardwareAdapter::new(SupplyDetect::new(), Relay::new(), StatusLed::new(), FreeRtos);
        let mut worker = Worker::new(
            plane,
            OfflineRemote::new(),
            hw,
            FreeRtos,
            LogEventSink::new(),
            EspSystem::new(),
        );
        worker.run(&EspClock::new());
    })?;

    spawn_task(CONSOLE_TASK, move || {
        let mut console = Console::new(
            plane,
            serial,
            nvs,
            EspSystem::new(),
            EspClock::new(),
            SupplyDetect::new(),
        );
        if let Err(e) = console.run() {
            error!("Console: transport closed ({})", e);
        }
    })?;

    // ── 6. Connect with stored credentials ────────────────────
    let stored = plane.config.snapshot();
    if stored.has_credentials() {
        match plane.wifi.connect(&stored.wifi_ssid, &stored.wifi_password) {
            Ok(()) => info!("WiFi: connected to '{}'", stored.wifi_ssid),
            Err(e) => warn!("WiFi: boot connection failed ({})", e),
        }
    } else {
        info!("WiFi: no stored credentials, use the 'wifi' console command");
    }

    // Keep the event subscriptions and SNTP alive.
    loop {
        FreeRtos::delay_ms(60_000);
    }
}
