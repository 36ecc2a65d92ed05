//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full history without
//! touching real GPIO, flash, or a network.  State that a test must watch
//! while another thread owns the adapter lives behind `Arc<Mutex<_>>`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use heapless::String as HString;
use remote_switch::adapters::wifi::LinkDriver;
use remote_switch::app::events::ServiceEvent;
use remote_switch::app::ports::{
    ActuatorPort, ClockPort, ConsoleTransport, EventSink, IndicatorPort, RemoteEventHandler,
    RemoteIdentity, RemoteSync, SensorPort, StoragePort, SystemPort,
};
use remote_switch::config::DeviceConfig;
use remote_switch::error::{
    ActuatorError, ConnectivityError, RemoteError, SensorError, StorageError, TransportError,
};

// ── Polling helper ────────────────────────────────────────────

/// Spin (1 ms sleeps) until `cond` holds; panics after 5 s.
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// A config with autostart on and a complete remote identity.
pub fn serving_config() -> DeviceConfig {
    let mut cfg = DeviceConfig::default();
    cfg.repository.push_str("git@example.com:switch.git").unwrap();
    cfg.private_key.push_str("-----BEGIN KEY-----\nabc\n").unwrap();
    cfg.settings.interval_secs = 1;
    cfg
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Off,
    Idle,
    Serving,
}

pub struct MockHardware {
    pub supply_on: bool,
    pub detect_error: Option<SensorError>,
    pub pulse_error: Option<ActuatorError>,
    pub pulses: Vec<u32>,
    pub indicator: Indicator,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            supply_on: false,
            detect_error: None,
            pulse_error: None,
            pulses: Vec::new(),
            indicator: Indicator::Off,
        }
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn detect(&mut self) -> Result<bool, SensorError> {
        match self.detect_error {
            Some(e) => Err(e),
            None => Ok(self.supply_on),
        }
    }
}

impl ActuatorPort for MockHardware {
    fn pulse(&mut self, duration_ms: u32) -> Result<(), ActuatorError> {
        if let Some(e) = self.pulse_error {
            return Err(e);
        }
        self.pulses.push(duration_ms);
        Ok(())
    }
}

impl IndicatorPort for MockHardware {
    fn show_idle(&mut self) {
        self.indicator = Indicator::Idle;
    }

    fn show_serving(&mut self) {
        self.indicator = Indicator::Serving;
    }
}

// ── MockDelay ─────────────────────────────────────────────────

/// Scales every delay down by 1000× (1 s → 1 ms) so loops still yield.
pub struct MockDelay;

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns) / 1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(ms)));
    }
}

// ── MockRemote ────────────────────────────────────────────────

/// Shared script and record for [`MockRemote`].
#[derive(Default)]
pub struct RemoteScript {
    /// Popped per `init`; empty means `Ok`.
    pub init_results: VecDeque<Result<(), RemoteError>>,
    /// Popped per `check_for_update`; `Ok(Some(text))` pushes `text` to the
    /// handler.  Empty means `Ok(None)`.
    pub checks: VecDeque<Result<Option<&'static str>, RemoteError>>,
    pub fail_commits: bool,
    pub inits: u32,
    pub check_calls: u32,
    pub commits: Vec<String>,
    pub last_repository: String,
    pub last_private_key: String,
}

#[derive(Clone, Default)]
pub struct MockRemote {
    pub script: Arc<Mutex<RemoteScript>>,
    handler: Option<Arc<dyn RemoteEventHandler>>,
}

#[allow(dead_code)]
impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checks(checks: impl IntoIterator<Item = Result<Option<&'static str>, RemoteError>>) -> Self {
        let remote = Self::new();
        remote.script.lock().unwrap().checks.extend(checks);
        remote
    }

    pub fn commits(&self) -> Vec<String> {
        self.script.lock().unwrap().commits.clone()
    }

    pub fn inits(&self) -> u32 {
        self.script.lock().unwrap().inits
    }
}

impl RemoteSync for MockRemote {
    fn init(
        &mut self,
        identity: &RemoteIdentity<'_>,
        handler: Arc<dyn RemoteEventHandler>,
    ) -> Result<(), RemoteError> {
        let mut script = self.script.lock().unwrap();
        script.inits += 1;
        script.last_repository = identity.repository.to_owned();
        script.last_private_key = identity.private_key.to_owned();
        let result = script.init_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.handler = Some(handler);
        }
        result
    }

    fn check_for_update(&mut self) -> Result<(), RemoteError> {
        let next = {
            let mut script = self.script.lock().unwrap();
            script.check_calls += 1;
            script.checks.pop_front().unwrap_or(Ok(None))
        };
        if let Some(text) = next? {
            if let Some(handler) = &self.handler {
                handler.on_remote_event(text);
            }
        }
        Ok(())
    }

    fn commit(&mut self, event: &str) -> Result<(), RemoteError> {
        let mut script = self.script.lock().unwrap();
        if script.fail_commits {
            return Err(RemoteError::Transport);
        }
        script.commits.push(event.to_owned());
        Ok(())
    }
}

// ── VecSink ───────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct VecSink {
    pub events: Arc<Mutex<Vec<ServiceEvent>>>,
}

#[allow(dead_code)]
impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<ServiceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&ServiceEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for VecSink {
    fn emit(&mut self, event: &ServiceEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── MockStore ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub data: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self, namespace: &str, key: &str) -> Option<String> {
        self.data
            .get(&format!("{namespace}::{key}"))
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

impl StoragePort for MockStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let v = self
            .data
            .get(&format!("{namespace}::{key}"))
            .ok_or(StorageError::NotFound)?;
        let n = v.len().min(buf.len());
        buf[..n].copy_from_slice(&v[..n]);
        Ok(n)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io(-1));
        }
        self.data.insert(format!("{namespace}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{namespace}::{key}"));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{namespace}::{key}"))
    }
}

// ── MockSystem / MockClock ────────────────────────────────────

pub struct MockSystem {
    pub heap: u32,
    pub restarts: u32,
}

impl MockSystem {
    pub fn new(heap: u32) -> Self {
        Self { heap, restarts: 0 }
    }
}

impl SystemPort for MockSystem {
    fn free_heap(&self) -> u32 {
        self.heap
    }

    fn restart(&mut self) {
        self.restarts += 1;
    }
}

pub struct MockClock {
    pub synced: bool,
    pub uptime_ms: u64,
}

#[allow(dead_code)]
impl MockClock {
    pub fn synced() -> Self {
        Self { synced: true, uptime_ms: 42_000 }
    }

    pub fn unsynced() -> Self {
        Self { synced: false, uptime_ms: 42_000 }
    }
}

impl ClockPort for MockClock {
    fn uptime_ms(&self) -> u64 {
        self.uptime_ms
    }

    fn is_synced(&self) -> bool {
        self.synced
    }

    fn wall_clock(&self) -> Option<HString<32>> {
        let mut s = HString::new();
        s.push_str("2024/02/29 12:34:56").ok()?;
        self.synced.then_some(s)
    }
}

// ── ScriptedTransport ─────────────────────────────────────────

/// Console input from a fixed byte script; `Closed` once it runs dry.
#[derive(Default)]
pub struct ScriptedTransport {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(script: &[u8]) -> Self {
        Self {
            input: script.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl ConsoleTransport for ScriptedTransport {
    fn read_byte(&mut self) -> Result<u8, TransportError> {
        self.input.pop_front().ok_or(TransportError::Closed)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.output.extend_from_slice(data);
        Ok(())
    }
}

/// Console input fed byte by byte from another thread; `Closed` once the
/// sender is dropped.
pub struct ChannelTransport {
    input: mpsc::Receiver<u8>,
    output: Arc<Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl ChannelTransport {
    pub fn new() -> (mpsc::Sender<u8>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { input: rx, output: Arc::default() })
    }

    /// Handle on everything written so far, readable while the console runs.
    pub fn output(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.output)
    }
}

impl ConsoleTransport for ChannelTransport {
    fn read_byte(&mut self) -> Result<u8, TransportError> {
        self.input.recv().map_err(|_| TransportError::Closed)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.output.lock().unwrap().extend_from_slice(data);
        Ok(())
    }
}

// ── MockLink ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LinkRecord {
    pub link_ups: Vec<(String, String)>,
    pub associates: u32,
    pub refuse_link_up: bool,
}

/// Link driver whose history stays readable after the manager owns it.
#[derive(Debug, Clone, Default)]
pub struct MockLink {
    pub record: Arc<Mutex<LinkRecord>>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        let link = Self::new();
        link.record.lock().unwrap().refuse_link_up = true;
        link
    }

    pub fn associates(&self) -> u32 {
        self.record.lock().unwrap().associates
    }

    pub fn link_ups(&self) -> Vec<(String, String)> {
        self.record.lock().unwrap().link_ups.clone()
    }
}

impl LinkDriver for MockLink {
    fn link_up(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        let mut record = self.record.lock().unwrap();
        if record.refuse_link_up {
            return Err(ConnectivityError::Driver(-1));
        }
        record.link_ups.push((ssid.to_owned(), password.to_owned()));
        Ok(())
    }

    fn associate(&mut self) -> Result<(), ConnectivityError> {
        self.record.lock().unwrap().associates += 1;
        Ok(())
    }
}
