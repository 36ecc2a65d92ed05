//! Inbound commands from the remote.
//!
//! The remote pushes free text; the first five bytes select the command.
//! Anything else is logged and ignored.

/// Length of the command tag at the head of a remote payload.
pub const TAG_LEN: usize = 5;

/// A remote command waiting for the worker's next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PendingResponse {
    #[default]
    None = 0,
    /// `STATE…`: sample the supply sensor, commit "ON"/"OFF".
    ReportState = 1,
    /// `PRESS…`: pulse the relay, commit "DONE".
    SwitchPress = 2,
}

impl PendingResponse {
    /// Map a remote payload by its 5-byte tag.  `None` for anything else.
    pub fn from_remote_text(text: &str) -> Self {
        match text.as_bytes().get(..TAG_LEN) {
            Some(b"STATE") => Self::ReportState,
            Some(b"PRESS") => Self::SwitchPress,
            _ => Self::None,
        }
    }

    pub fn is_pending(self) -> bool {
        self != Self::None
    }
}

/// Event texts committed back to the remote.
pub mod reply {
    pub const ON: &str = "ON";
    pub const OFF: &str = "OFF";
    pub const DONE: &str = "DONE";
}
