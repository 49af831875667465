//! Single-slot handoff of the active session
//!
//! Logon publishes into the slot, logout clears it, the scheduler watches
//! it. The latest published session wins; a reader that was bound to an
//! older one sees the change and rebinds.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use types::SessionId;

#[derive(Debug, Clone)]
pub struct SessionHandoff {
    slot: Arc<watch::Sender<Option<SessionId>>>,
}

impl SessionHandoff {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
        }
    }

    /// Make `session` the active session, replacing any previous one
    pub fn publish(&self, session: SessionId) {
        if let Some(previous) = self.slot.send_replace(Some(session)) {
            debug!(%previous, "Active session replaced");
        }
    }

    /// Clear the slot if it still holds `session`
    ///
    /// Returns `false` when a newer session has already taken the slot.
    pub fn clear(&self, session: &SessionId) -> bool {
        self.slot.send_if_modified(|current| {
            if current.as_ref() == Some(session) {
                *current = None;
                true
            } else {
                false
            }
        })
    }

    pub fn current(&self) -> Option<SessionId> {
        self.slot.borrow().clone()
    }

    pub fn is_active(&self, session: &SessionId) -> bool {
        self.slot.borrow().as_ref() == Some(session)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionId>> {
        self.slot.subscribe()
    }
}

impl Default for SessionHandoff {
    fn default() -> Self {
        Self::new()
    }
}
