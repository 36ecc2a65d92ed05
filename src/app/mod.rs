//! Application core: domain logic behind port traits.
//!
//! The worker loop, the remote-command mailbox, and the control plane the
//! console and worker share.  All interaction with hardware, storage and
//! the remote happens through the **port traits** in [`ports`], keeping
//! this layer testable without real peripherals.

pub mod commands;
pub mod events;
pub mod mailbox;
pub mod plane;
pub mod ports;
pub mod worker;
