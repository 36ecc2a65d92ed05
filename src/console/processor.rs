//! Console processor: line editing over a byte transport plus command
//! dispatch.
//!
//! Runs as its own task, blocking on one byte at a time.  Control bytes:
//!
//! | byte | at the prompt              | inside a multi-line read       |
//! |------|----------------------------|--------------------------------|
//! | CR   | complete the line          | stored as `\n`, echoed `\r\r\n` |
//! | ESC  | abort the line             | cancel the read                |
//! | ^S   | echoed as `^S`, ignored    | complete the read              |
//! | BS   | consumed silently          | consumed silently              |

use core::fmt;

use heapless::{String, Vec};
use log::{error, info, warn};

use crate::adapters::wifi::LinkDriver;
use crate::app::plane::ControlPlane;
use crate::app::ports::{ClockPort, ConsoleTransport, SensorPort, StoragePort, SystemPort};
use crate::config::{PASSWORD_CAP, PRIVKEY_CAP, REPERTORY_CAP, SSID_CAP};
use crate::error::{StorageError, TransportError};
use crate::fsm::TransitionOutcome;

use super::commands::{COMMANDS, Command, ParsedLine, first_arg, parse_line};
use super::line_buffer::{LINE_SIZE, LineBuffer, Overflow};

pub const PROMPT: &str = "\r\r\nSWITCH# ";
pub const NEWLINE: &str = "\r\r\n";

pub const CR: u8 = b'\r';
pub const ESC: u8 = 0x1B;
pub const CTRL_S: u8 = 0x13;
pub const BACKSPACE: u8 = 0x08;
/// Terminator for secret entry; only Ctrl-S can actually produce it.
const END_OF_INPUT: u8 = 0x00;

pub struct Console<'a, L, T, St, Y, C, Sn> {
    plane: &'a ControlPlane<L>,
    transport: T,
    storage: St,
    system: Y,
    clock: C,
    sensor: Sn,
    line: LineBuffer,
}

impl<'a, L, T, St, Y, C, Sn> Console<'a, L, T, St, Y, C, Sn>
where
    L: LinkDriver,
    T: ConsoleTransport,
    St: StoragePort,
    Y: SystemPort,
    C: ClockPort,
    Sn: SensorPort,
{
    pub fn new(
        plane: &'a ControlPlane<L>,
        transport: T,
        storage: St,
        system: Y,
        clock: C,
        sensor: Sn,
    ) -> Self {
        Self {
            plane,
            transport,
            storage,
            system,
            clock,
            sensor,
            line: LineBuffer::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn storage(&self) -> &St {
        &self.storage
    }

    pub fn system(&self) -> &Y {
        &self.system
    }

    // ── Main loop ─────────────────────────────────────────────

    /// Banner, then edit/dispatch until the transport closes.
    pub fn run(&mut self) -> Result<(), TransportError> {
        self.banner()?;
        self.help()?;
        loop {
            if self.line.is_empty() {
                self.write(PROMPT)?;
            }
            match self.transport.read_byte() {
                Ok(byte) => self.process_byte(byte)?,
                Err(TransportError::ReadFailed) => error!("Console: read failed"),
                Err(e) => return Err(e),
            }
        }
    }

    /// Feed one byte from the prompt.
    pub fn process_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        match byte {
            CTRL_S => self.write("^S\r\r\n"),
            ESC => {
                self.line.clear();
                self.write("ESC\r\r\n")
            }
            BACKSPACE => Ok(()),
            CR => {
                self.write(NEWLINE)?;
                let mut raw = [0u8; LINE_SIZE];
                let len = self.line.len();
                raw[..len].copy_from_slice(self.line.as_bytes());
                self.line.clear();
                match core::str::from_utf8(&raw[..len]) {
                    Ok(text) => self.dispatch(text),
                    Err(_) => self.unknown(&std::string::String::from_utf8_lossy(&raw[..len])),
                }
            }
            other => {
                self.transport.write_bytes(&[other])?;
                if let Err(Overflow) = self.line.push(other) {
                    error!("Console: command too long");
                }
                Ok(())
            }
        }
    }

    // ── Dispatch ──────────────────────────────────────────────

    fn dispatch(&mut self, line: &str) -> Result<(), TransportError> {
        match parse_line(line) {
            ParsedLine::Empty => Ok(()),
            ParsedLine::Unknown(text) => self.unknown(text),
            ParsedLine::Known { command, args } => match command {
                Command::Wifi => self.cmd_wifi(),
                Command::Heap => self.print(format_args!(
                    "Free heap size: {}bytes\r\n",
                    self.system.free_heap()
                )),
                Command::Privkey => self.cmd_privkey(),
                Command::Repertory => self.cmd_repertory(args),
                Command::Show => self.cmd_show(),
                Command::Reset => {
                    self.write("Restarting now.\r\r\n")?;
                    self.system.restart();
                    Ok(())
                }
                Command::Start => self.start_service(),
                Command::Stop => self.stop_service(),
                Command::Help => self.help(),
            },
        }
    }

    fn unknown(&mut self, text: &str) -> Result<(), TransportError> {
        self.print(format_args!("Unknown command: {}\r\n\r\n", text))?;
        self.help()
    }

    fn cmd_wifi(&mut self) -> Result<(), TransportError> {
        self.write("SSID: ")?;
        let Some(ssid) = self.read_text::<SSID_CAP>(CR)? else {
            return self.write("\r\r\nNot changed\r\n");
        };
        self.write(NEWLINE)?;

        self.write("PASSWORD: ")?;
        let Some(password) = self.read_text::<PASSWORD_CAP>(CR)? else {
            return self.write("\r\r\nNot changed\r\n");
        };
        self.write(NEWLINE)?;

        self.plane.config.update(|c| {
            c.wifi_ssid = ssid.clone();
            c.wifi_password = password.clone();
        });
        if let Err(e) = self.plane.config.snapshot().save_credentials(&mut self.storage) {
            warn!("Console: WiFi credentials not persisted ({})", e);
        }

        let reply = match self.plane.wifi.connect(&ssid, &password) {
            Ok(()) => "Connection succeeded",
            Err(_) => "Connection failed",
        };
        self.print(format_args!("{}\r\n", reply))?;
        self.print(format_args!(
            "Free heap size: {}bytes\r\n",
            self.system.free_heap()
        ))
    }

    fn cmd_privkey(&mut self) -> Result<(), TransportError> {
        let plane = self.plane;
        let _hold = plane.supervisor.hold_autostart();
        let was_serving = self.pause_service()?;

        self.write("\r\nInput private key:\r\n")?;
        match self.read_text::<PRIVKEY_CAP>(END_OF_INPUT)? {
            None => self.write("\r\nNot saved\r\n")?,
            Some(key) => {
                self.plane.config.update(|c| c.private_key = key);
                let saved = self.plane.config.snapshot().save_private_key(&mut self.storage);
                match saved {
                    Ok(()) => self.write("\r\nSaved\r\n")?,
                    Err(e) => return self.persist_failed("private key", e),
                }
            }
        }

        self.resume_service(was_serving)
    }

    fn cmd_repertory(&mut self, args: &str) -> Result<(), TransportError> {
        let plane = self.plane;
        let _hold = plane.supervisor.hold_autostart();
        let was_serving = self.pause_service()?;

        let mut locator: String<REPERTORY_CAP> = String::new();
        match first_arg(args).map(|url| locator.push_str(url)) {
            Some(Ok(())) => {
                self.plane.config.update(|c| c.repository = locator);
                let saved = self.plane.config.snapshot().save_repository(&mut self.storage);
                match saved {
                    Ok(()) => self.write("Changed\r\n")?,
                    Err(e) => return self.persist_failed("repertory", e),
                }
            }
            _ => self.write("Invalid parameter\r\n")?,
        }

        self.resume_service(was_serving)
    }

    fn cmd_show(&mut self) -> Result<(), TransportError> {
        let cfg = self.plane.config.snapshot();
        let wifi = if self.plane.wifi.available() {
            "connect"
        } else {
            "disconnect"
        };
        let time = self.clock.wall_clock();
        let uptime = self.clock.uptime_ms();
        let server = if self.plane.supervisor.is_serving() {
            "running"
        } else {
            "stopped"
        };

        self.print(format_args!("Wifi state    : {}\r\n", wifi))?;
        match time {
            Some(t) => self.print(format_args!("Time          : {}\r\n", t))?,
            None => self.write("Time          : not synced\r\n")?,
        }
        self.print(format_args!("Running time  : {} ms\r\n", uptime))?;
        match self.sensor.detect() {
            Ok(on) => self.print(format_args!("Detect state  : {}\r\n", if on { "on" } else { "off" }))?,
            Err(e) => {
                warn!("Console: supply detect failed ({})", e);
                self.write("Detect state  : unknown\r\n")?;
            }
        }
        self.print(format_args!("Device name   : {}\r\n", cfg.settings.device_name))?;
        self.print(format_args!("Device id     : {}\r\n", cfg.settings.device_id))?;
        self.print(format_args!(
            "Loop interval : {} second\r\n",
            cfg.settings.interval()
        ))?;
        self.print(format_args!("Repertory     : {}\r\n", cfg.repository))?;
        self.print(format_args!("Server state  : {}\r\n", server))?;
        self.print(format_args!(
            "Private key   : {}\r\n",
            if cfg.private_key.is_empty() { "not set" } else { "set" }
        ))
    }

    pub fn banner(&mut self) -> Result<(), TransportError> {
        let name = self.plane.config.read(|c| c.settings.device_name.clone());
        self.write("\r\n")?;
        self.print(format_args!(
            "Remote Switch v{} :: {}\r\n",
            env!("CARGO_PKG_VERSION"),
            name
        ))?;
        self.write("MIT License\r\n\r\n")
    }

    pub fn help(&mut self) -> Result<(), TransportError> {
        self.write("Help:\r\n")?;
        for c in COMMANDS {
            self.print(format_args!("  {:<22}- {}\r\n", c.usage, c.brief))?;
        }
        Ok(())
    }

    // ── Supervisor helpers ────────────────────────────────────

    fn start_service(&mut self) -> Result<(), TransportError> {
        match self.plane.supervisor.request_start() {
            Ok(TransitionOutcome::Settled) => Ok(()),
            Ok(TransitionOutcome::AlreadySettled) => self.write("Service is already running\r\n"),
            Err(e) => {
                warn!("Console: start failed ({})", e);
                self.write("Service starts failing\r\n")
            }
        }
    }

    fn stop_service(&mut self) -> Result<(), TransportError> {
        match self.plane.supervisor.request_stop() {
            Ok(TransitionOutcome::Settled) => Ok(()),
            Ok(TransitionOutcome::AlreadySettled) => self.write("Service has stopped\r\n"),
            Err(e) => {
                warn!("Console: stop failed ({})", e);
                self.write("Service stop failed\r\n")
            }
        }
    }

    /// Stop the service around a reconfiguration.  Returns whether it was
    /// running.  Callers hold autostart off first, so a boot-time autostart
    /// either happened before this check or waits until the hold drops.
    fn pause_service(&mut self) -> Result<bool, TransportError> {
        let was_serving = self.plane.supervisor.is_serving();
        if was_serving {
            self.stop_service()?;
        }
        Ok(was_serving)
    }

    fn resume_service(&mut self, was_serving: bool) -> Result<(), TransportError> {
        if was_serving {
            self.start_service()?;
        }
        Ok(())
    }

    /// Losing a private key or repertory write leaves flash and memory
    /// disagreeing; restart rather than run on.
    fn persist_failed(&mut self, what: &str, e: StorageError) -> Result<(), TransportError> {
        error!("Console: saving {} failed ({}), restarting", what, e);
        self.write("Restarting now.\r\r\n")?;
        self.system.restart();
        Ok(())
    }

    // ── I/O helpers ───────────────────────────────────────────

    /// Multi-line read.  Ends on `end` or Ctrl-S; ESC, overflow and
    /// invalid UTF-8 all yield `None`.
    fn read_text<const N: usize>(&mut self, end: u8) -> Result<Option<String<N>>, TransportError> {
        let mut bytes: Vec<u8, N> = Vec::new();
        loop {
            let byte = match self.transport.read_byte()? {
                b if b == end || b == CTRL_S => break,
                ESC => {
                    info!("Console: input cancelled");
                    return Ok(None);
                }
                BACKSPACE => continue,
                CR => {
                    self.write(NEWLINE)?;
                    b'\n'
                }
                other => {
                    self.transport.write_bytes(&[other])?;
                    other
                }
            };
            if bytes.push(byte).is_err() {
                error!("Console: content is too long");
                return Ok(None);
            }
        }
        match String::from_utf8(bytes) {
            Ok(text) => Ok(Some(text)),
            Err(_) => {
                warn!("Console: input is not UTF-8");
                Ok(None)
            }
        }
    }

    fn write(&mut self, text: &str) -> Result<(), TransportError> {
        self.transport.write_bytes(text.as_bytes())
    }

    fn print(&mut self, args: fmt::Arguments<'_>) -> Result<(), TransportError> {
        let text = args.to_string();
        self.write(&text)
    }
}
