//! State shared by the console and worker tasks.
//!
//! Built once at boot.  Firmware leaks it to `&'static`; host tests borrow
//! it into `std::thread::scope`.

use std::sync::Arc;

use crate::adapters::wifi::{ConnectionManager, LinkDriver};
use crate::config::{DeviceConfig, SharedConfig};
use crate::fsm::Supervisor;

use super::mailbox::Mailbox;

pub struct ControlPlane<L> {
    pub supervisor: Supervisor,
    pub mailbox: Arc<Mailbox>,
    pub config: SharedConfig,
    pub wifi: ConnectionManager<L>,
}

impl<L: LinkDriver> ControlPlane<L> {
    pub fn new(config: DeviceConfig, link: L) -> Self {
        Self {
            supervisor: Supervisor::new(),
            mailbox: Arc::new(Mailbox::new()),
            config: SharedConfig::new(config),
            wifi: ConnectionManager::new(link),
        }
    }
}
