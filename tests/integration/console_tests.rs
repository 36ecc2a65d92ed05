//! Console line editing and command dispatch over a scripted transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use remote_switch::adapters::wifi::LinkEvent;
use remote_switch::app::plane::ControlPlane;
use remote_switch::app::ports::StoragePort;
use remote_switch::config::{DeviceConfig, KEY_PRIVKEY, KEY_REPERTORY, KEY_WIFI_PASS, KEY_WIFI_SSID, NAMESPACE};
use remote_switch::console::{COMMANDS, Console, PROMPT};
use remote_switch::error::{SensorError, StorageError, TransportError};
use remote_switch::fsm::SupervisorState;

use crate::mock_hw::{
    MockClock, MockHardware, MockLink, MockStore, MockSystem, ScriptedTransport, wait_until,
};

type TestConsole<'a, S = MockStore> =
    Console<'a, MockLink, ScriptedTransport, S, MockSystem, MockClock, MockHardware>;

fn console_full<'a, S: StoragePort>(
    plane: &'a ControlPlane<MockLink>,
    script: &[u8],
    store: S,
    sensor: MockHardware,
) -> TestConsole<'a, S> {
    let mut console = Console::new(
        plane,
        ScriptedTransport::new(script),
        store,
        MockSystem::new(98_765),
        MockClock::synced(),
        sensor,
    );
    assert_eq!(console.run(), Err(TransportError::Closed));
    console
}

fn console_with<'a>(plane: &'a ControlPlane<MockLink>, script: &[u8], store: MockStore) -> TestConsole<'a> {
    console_full(plane, script, store, MockHardware::new())
}

fn run_script<'a>(plane: &'a ControlPlane<MockLink>, script: &[u8]) -> TestConsole<'a> {
    console_with(plane, script, MockStore::new())
}

fn plane() -> ControlPlane<MockLink> {
    ControlPlane::new(DeviceConfig::default(), MockLink::new())
}

// ── Line editing ──────────────────────────────────────────────

#[test]
fn banner_help_and_prompt_come_first() {
    let plane = plane();
    let c = run_script(&plane, b"");
    let out = c.transport().text();

    assert!(out.contains("ESP32C3 Remote Switch"));
    assert!(out.contains("Help:\r\n"));
    for cmd in COMMANDS {
        assert!(out.contains(&format!("  {:<22}- {}\r\n", cmd.usage, cmd.brief)));
    }
    assert!(out.ends_with(PROMPT));
}

#[test]
fn typed_bytes_are_echoed() {
    let plane = plane();
    let c = run_script(&plane, b"hea");
    assert!(c.transport().text().ends_with(&format!("{PROMPT}hea")));
}

#[test]
fn heap_reports_free_bytes() {
    let plane = plane();
    let c = run_script(&plane, b"heap\r");
    let out = c.transport().text();
    assert!(out.contains("heap\r\r\nFree heap size: 98765bytes\r\n"));
    assert_eq!(out.matches("Free heap size").count(), 1);
}

#[test]
fn non_utf8_line_is_reported_as_unknown() {
    let plane = plane();
    let c = run_script(&plane, b"\xFFheap\r");
    let out = c.transport().text();
    assert!(out.contains("Unknown command: \u{FFFD}heap\r\n\r\nHelp:"));
    assert!(!out.contains("Free heap size"));
}

#[test]
fn backspace_is_swallowed() {
    let plane = plane();
    let c = run_script(&plane, b"he\x08ap\r");
    let out = c.transport().text();
    assert!(out.contains("Free heap size"));
    assert!(!out.contains('\x08'));
}

#[test]
fn escape_discards_the_line() {
    let plane = plane();
    let c = run_script(&plane, b"bogus\x1bheap\r");
    let out = c.transport().text();
    assert!(out.contains("bogusESC\r\r\n"));
    assert!(!out.contains("Unknown command"));
    assert!(out.contains("Free heap size"));
}

#[test]
fn ctrl_s_at_the_prompt_is_ignored() {
    let plane = plane();
    let c = run_script(&plane, b"he\x13ap\r");
    let out = c.transport().text();
    assert!(out.contains("he^S\r\r\nap"));
    assert!(out.contains("Free heap size"));
}

#[test]
fn overlong_line_is_dropped() {
    let plane = plane();
    let mut script = vec![b'x'; 128];
    script.extend_from_slice(b"\r");
    let c = run_script(&plane, &script);
    assert!(!c.transport().text().contains("Unknown command"));
}

#[test]
fn unknown_command_prints_help() {
    let plane = plane();
    let c = run_script(&plane, b"heapX\r");
    let out = c.transport().text();
    let unknown = out.find("Unknown command: heapX\r\n\r\n").expect("unknown reply");
    assert!(out[unknown..].contains("Help:\r\n"));
}

#[test]
fn blank_line_just_reprompts() {
    let plane = plane();
    let c = run_script(&plane, b"\r\r");
    let out = c.transport().text();
    assert_eq!(out.matches(PROMPT).count(), 3);
    assert!(!out.contains("Unknown command"));
}

// ── Configuration commands ────────────────────────────────────

#[test]
fn repertory_without_argument_is_invalid() {
    let plane = plane();
    let c = run_script(&plane, b"repertory\r");
    assert!(c.transport().text().contains("Invalid parameter\r\n"));
    assert!(!c.storage().exists(NAMESPACE, KEY_REPERTORY));
}

#[test]
fn repertory_is_saved_and_applied() {
    let plane = plane();
    let c = run_script(&plane, b"repertory git@example.com:sw.git trailing\r");

    assert!(c.transport().text().contains("Changed\r\n"));
    assert_eq!(
        c.storage().text(NAMESPACE, KEY_REPERTORY).as_deref(),
        Some("git@example.com:sw.git")
    );
    assert_eq!(plane.config.snapshot().repository.as_str(), "git@example.com:sw.git");
}

#[test]
fn repertory_save_failure_restarts() {
    let plane = plane();
    let mut store = MockStore::new();
    store.fail_writes = true;
    let c = console_with(&plane, b"repertory git@h:r.git\r", store);
    assert!(c.transport().text().contains("Restarting now.\r\r\n"));
    assert_eq!(c.system().restarts, 1);
}

#[test]
fn repertory_pauses_and_resumes_a_running_service() {
    let plane = plane();
    plane.supervisor.begin_serving();
    let done = AtomicBool::new(false);
    let mut settles = Vec::new();

    let c = thread::scope(|s| {
        let settler = s.spawn(|| {
            let mut seen = Vec::new();
            while !done.load(Ordering::Acquire) {
                if plane.supervisor.stop_requested() {
                    plane.supervisor.settle(SupervisorState::Stopped);
                    seen.push(SupervisorState::Stopped);
                } else if plane.supervisor.start_requested() {
                    plane.supervisor.settle(SupervisorState::Serving);
                    seen.push(SupervisorState::Serving);
                }
                thread::sleep(Duration::from_millis(1));
            }
            seen
        });
        let c = run_script(&plane, b"repertory git@h:r.git\r");
        done.store(true, Ordering::Release);
        settles = settler.join().unwrap();
        c
    });

    assert!(c.transport().text().contains("Changed\r\n"));
    assert_eq!(settles, vec![SupervisorState::Stopped, SupervisorState::Serving]);
    assert!(plane.supervisor.is_serving());
    assert_eq!(plane.config.snapshot().repository.as_str(), "git@h:r.git");
}

#[test]
fn private_key_is_read_until_ctrl_s() {
    let plane = plane();
    let c = run_script(&plane, b"privkey\r-----BEGIN-----\rabc\x08\rEND\x13");

    let out = c.transport().text();
    assert!(out.contains("\r\nInput private key:\r\n"));
    assert!(out.contains("\r\nSaved\r\n"));
    let expected = "-----BEGIN-----\nabc\nEND";
    assert_eq!(plane.config.snapshot().private_key.as_str(), expected);
    assert_eq!(c.storage().text(NAMESPACE, KEY_PRIVKEY).as_deref(), Some(expected));
}

#[test]
fn private_key_entry_can_be_cancelled() {
    let plane = plane();
    let c = run_script(&plane, b"privkey\rsecret\x1b");
    assert!(c.transport().text().contains("Not saved"));
    assert!(plane.config.snapshot().private_key.is_empty());
    assert!(!c.storage().exists(NAMESPACE, KEY_PRIVKEY));
}

#[test]
fn private_key_save_failure_restarts() {
    let plane = plane();
    let mut store = MockStore::new();
    store.fail_writes = true;
    let c = console_with(&plane, b"privkey\rkey\x13", store);
    assert!(c.transport().text().contains("Restarting now.\r\r\n"));
    assert_eq!(c.system().restarts, 1);
}

/// Storage that looks at the live config while a value is being written,
/// the way a second task could.
struct ConfigReadingStore<'a> {
    plane: &'a ControlPlane<MockLink>,
    inner: MockStore,
    seen: Vec<String>,
}

impl StoragePort for ConfigReadingStore<'_> {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.inner.read(namespace, key, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let repository = self.plane.config.read(|c| c.repository.as_str().to_owned());
        self.seen.push(repository);
        self.inner.write(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.inner.delete(namespace, key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.inner.exists(namespace, key)
    }
}

#[test]
fn config_stays_readable_while_values_are_saved() {
    let plane = plane();
    let store = ConfigReadingStore { plane: &plane, inner: MockStore::new(), seen: Vec::new() };
    let c = console_full(
        &plane,
        b"repertory git@h:r.git\rprivkey\rkey\x13",
        store,
        MockHardware::new(),
    );

    let out = c.transport().text();
    assert!(out.contains("Changed\r\n"));
    assert!(out.contains("\r\nSaved\r\n"));
    assert_eq!(c.storage().seen, vec!["git@h:r.git".to_owned(), "git@h:r.git".to_owned()]);
    assert_eq!(c.storage().inner.text(NAMESPACE, KEY_PRIVKEY).as_deref(), Some("key"));
}

#[test]
fn wifi_prompts_connects_and_persists() {
    let link = MockLink::new();
    let plane = ControlPlane::new(DeviceConfig::default(), link.clone());

    let c = thread::scope(|s| {
        s.spawn(|| {
            wait_until("link-up", || link.link_ups().len() == 1);
            plane.wifi.handle_event(LinkEvent::Started);
            plane.wifi.handle_event(LinkEvent::AddressAcquired);
        });
        run_script(&plane, b"wifi\rhome\rsecret123\r")
    });

    let out = c.transport().text();
    assert!(out.contains("SSID: home\r\r\n"));
    assert!(out.contains("PASSWORD: secret123\r\r\n"));
    assert!(out.contains("Connection succeeded\r\n"));
    assert!(out.contains("Free heap size: 98765bytes"));
    assert_eq!(link.link_ups(), vec![("home".to_owned(), "secret123".to_owned())]);
    assert_eq!(c.storage().text(NAMESPACE, KEY_WIFI_SSID).as_deref(), Some("home"));
    assert_eq!(c.storage().text(NAMESPACE, KEY_WIFI_PASS).as_deref(), Some("secret123"));
    assert!(plane.wifi.available());
}

#[test]
fn wifi_escape_changes_nothing() {
    let link = MockLink::new();
    let plane = ControlPlane::new(DeviceConfig::default(), link.clone());
    let c = run_script(&plane, b"wifi\rhome\x1b");
    assert!(c.transport().text().contains("Not changed"));
    assert!(link.link_ups().is_empty());
    assert!(plane.config.snapshot().wifi_ssid.is_empty());
}

#[test]
fn wifi_with_invalid_ssid_fails() {
    let plane = plane();
    let c = run_script(&plane, b"wifi\r\rpw\r");
    assert!(c.transport().text().contains("Connection failed\r\n"));
}

// ── Status and control ────────────────────────────────────────

#[test]
fn show_lists_every_field() {
    let mut cfg = DeviceConfig::default();
    cfg.repository.push_str("git@example.com:sw.git").unwrap();
    let plane = ControlPlane::new(cfg, MockLink::new());
    let c = run_script(&plane, b"show\r");
    let out = c.transport().text();

    for line in [
        "Wifi state    : disconnect\r\n",
        "Time          : 2024/02/29 12:34:56\r\n",
        "Running time  : 42000 ms\r\n",
        "Detect state  : off\r\n",
        "Device name   : ESP32C3 Remote Switch\r\n",
        "Device id     : 0000000000000001\r\n",
        "Loop interval : 5 second\r\n",
        "Repertory     : git@example.com:sw.git\r\n",
        "Server state  : stopped\r\n",
        "Private key   : not set\r\n",
    ] {
        assert!(out.contains(line), "missing {line:?}");
    }
}

#[test]
fn show_reports_detect_state() {
    let plane = plane();
    let mut on = MockHardware::new();
    on.supply_on = true;
    let c = console_full(&plane, b"show\r", MockStore::new(), on);
    assert!(c.transport().text().contains("Running time  : 42000 ms\r\nDetect state  : on\r\n"));

    let mut broken = MockHardware::new();
    broken.detect_error = Some(SensorError::AdcReadFailed(-1));
    let c = console_full(&plane, b"show\r", MockStore::new(), broken);
    let out = c.transport().text();
    assert!(out.contains("Detect state  : unknown\r\n"));
    assert!(out.contains("Server state  : stopped\r\n"));
}

#[test]
fn stop_when_stopped_says_so() {
    let plane = plane();
    let c = run_script(&plane, b"stop\r");
    assert!(c.transport().text().contains("Service has stopped\r\n"));
}

#[test]
fn start_when_running_says_so() {
    let plane = plane();
    plane.supervisor.begin_serving();
    let c = run_script(&plane, b"start\r");
    assert!(c.transport().text().contains("Service is already running\r\n"));
}

#[test]
fn reset_restarts_the_device() {
    let plane = plane();
    let c = run_script(&plane, b"reset\r");
    assert!(c.transport().text().contains("Restarting now.\r\r\n"));
    assert_eq!(c.system().restarts, 1);
}
