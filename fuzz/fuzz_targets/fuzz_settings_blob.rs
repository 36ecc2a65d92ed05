//! Fuzz target: settings blob loaded from flash
//!
//! Stores arbitrary bytes under the `settings` key and loads the device
//! configuration.  A corrupt blob must fall back to defaults, never panic,
//! and the effective interval is never zero.
//!
//! cargo fuzz run fuzz_settings_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use remote_switch::adapters::nvs::NvsAdapter;
use remote_switch::app::ports::StoragePort;
use remote_switch::config::{DeviceConfig, KEY_SETTINGS, NAMESPACE};

fuzz_target!(|data: &[u8]| {
    let Ok(mut nvs) = NvsAdapter::new() else {
        return;
    };
    if nvs.write(NAMESPACE, KEY_SETTINGS, data).is_err() {
        return;
    }

    let cfg = DeviceConfig::load(&nvs);
    assert!(cfg.settings.interval() >= 1);
    assert!(cfg.repository.is_empty());
});
