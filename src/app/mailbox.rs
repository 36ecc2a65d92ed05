//! One-slot pending-response mailbox.
//!
//! Written by the remote callback (whatever task the remote library calls
//! back on), drained by the worker once per tick.  At most one command is
//! pending; a newer one overwrites an unconsumed one.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info};

use super::commands::PendingResponse;
use super::ports::RemoteEventHandler;

pub struct Mailbox {
    slot: Mutex<CriticalSectionRawMutex, Cell<PendingResponse>>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(PendingResponse::None)),
        }
    }

    /// Store `response`, replacing whatever was there.  Returns the
    /// overwritten command, if any.
    pub fn post(&self, response: PendingResponse) -> PendingResponse {
        let previous = self.slot.lock(|s| s.replace(response));
        if previous.is_pending() && previous != response {
            debug!("Mailbox: {:?} overwritten by {:?}", previous, response);
        }
        previous
    }

    /// Remove and return the pending command, leaving the slot empty.
    pub fn take(&self) -> PendingResponse {
        self.slot.lock(|s| s.replace(PendingResponse::None))
    }

    pub fn peek(&self) -> PendingResponse {
        self.slot.lock(Cell::get)
    }

    /// Handle a raw remote payload: log it, map the tag, post if known.
    pub fn deliver(&self, text: &str) -> PendingResponse {
        let printable: String = text
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        info!("Remote say: {}", printable);

        let response = PendingResponse::from_remote_text(text);
        match response {
            PendingResponse::None => debug!("Mailbox: payload ignored"),
            r => {
                info!("Mailbox: response set to {:?}", r);
                self.post(r);
            }
        }
        response
    }
}

impl RemoteEventHandler for Mailbox {
    fn on_remote_event(&self, text: &str) {
        self.deliver(text);
    }
}
