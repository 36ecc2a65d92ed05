//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                    |
//! |------------|---------------------|--------------------------------|
//! | `hardware` | SensorPort          | ESP32-C3 ADC (supply detect)   |
//! |            | ActuatorPort        | Relay GPIO                     |
//! |            | IndicatorPort       | Red/green LEDC channels        |
//! | `log_sink` | EventSink           | Serial log output              |
//! | `nvs`      | StoragePort         | NVS / in-memory store          |
//! | `remote`   | RemoteSync          | Offline stand-in               |
//! | `serial`   | ConsoleTransport    | USB-Serial/JTAG / stdio        |
//! | `system`   | SystemPort          | Heap stats, restart            |
//! | `time`     | ClockPort           | esp_timer + SNTP wall clock    |
//! | `wifi`     | (connection manager)| ESP-IDF WiFi STA               |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod remote;
pub mod serial;
pub mod system;
pub mod time;
pub mod wifi;
