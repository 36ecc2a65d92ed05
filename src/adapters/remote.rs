//! Offline stand-in for the remote sync library.
//!
//! The sync protocol is supplied by an external component that implements
//! [`RemoteSync`].  Until one is linked, the firmware runs against
//! [`OfflineRemote`]: it validates the identity the way a real session
//! would, keeps the event handler, and logs every commit.  Payloads can be
//! injected with [`OfflineRemote::inject`] to exercise the worker without a
//! server.

use std::sync::Arc;

use heapless::String;
use log::{debug, info};

use crate::app::ports::{RemoteEventHandler, RemoteIdentity, RemoteSync};
use crate::error::RemoteError;

pub struct OfflineRemote {
    handler: Option<Arc<dyn RemoteEventHandler>>,
    device_id: String<32>,
    commits: u32,
}

impl Default for OfflineRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineRemote {
    pub fn new() -> Self {
        Self {
            handler: None,
            device_id: String::new(),
            commits: 0,
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.handler.is_some()
    }

    /// Hand `text` to the registered handler as if the remote had pushed it.
    pub fn inject(&self, text: &str) -> Result<(), RemoteError> {
        let handler = self.handler.as_ref().ok_or(RemoteError::Transport)?;
        handler.on_remote_event(text);
        Ok(())
    }

    pub fn commits(&self) -> u32 {
        self.commits
    }
}

impl RemoteSync for OfflineRemote {
    fn init(
        &mut self,
        identity: &RemoteIdentity<'_>,
        handler: Arc<dyn RemoteEventHandler>,
    ) -> Result<(), RemoteError> {
        if identity.repository.is_empty() || identity.private_key.is_empty() {
            return Err(RemoteError::BadIdentity);
        }
        self.device_id.clear();
        self.device_id
            .push_str(identity.device_id)
            .map_err(|()| RemoteError::BadIdentity)?;
        self.handler = Some(handler);
        info!(
            "Remote(offline): session for '{}' ({}) at {}",
            identity.device_name, identity.device_id, identity.repository
        );
        Ok(())
    }

    fn check_for_update(&mut self) -> Result<(), RemoteError> {
        if self.handler.is_none() {
            return Err(RemoteError::Transport);
        }
        debug!("Remote(offline): no updates");
        Ok(())
    }

    fn commit(&mut self, event: &str) -> Result<(), RemoteError> {
        if self.handler.is_none() {
            return Err(RemoteError::Transport);
        }
        self.commits = self.commits.wrapping_add(1);
        info!("Remote(offline): {} commit '{}'", self.device_id, event);
        Ok(())
    }
}
