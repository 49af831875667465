//! Contract with the external FIX engine
//!
//! The engine owns the wire protocol: handshake, sequence numbers, framing,
//! the message store, resends, heartbeats and logout. The bridge only sees
//! lifecycle callbacks, decoded messages and a send primitive.

use crate::Result;
use async_trait::async_trait;
use types::{Message, MessageRejectError, SessionId};

/// Callbacks the engine drives, possibly from several threads
///
/// Implementations must not block on network I/O.
pub trait Application: Send + Sync {
    /// A session was created from settings
    fn on_create(&self, session: &SessionId);

    /// Logon completed
    fn on_logon(&self, session: &SessionId);

    /// The session logged out or disconnected
    fn on_logout(&self, session: &SessionId);

    /// Before an admin message is sent
    fn to_admin(&self, message: &mut Message, session: &SessionId);

    /// Before an application message is sent
    fn to_app(&self, message: &mut Message, session: &SessionId);

    /// An admin message was received
    fn from_admin(&self, message: &Message, session: &SessionId)
        -> std::result::Result<(), MessageRejectError>;

    /// An application message was received
    ///
    /// A returned reject is answered by the engine's standard reject
    /// mechanism; the session continues.
    fn from_app(&self, message: &Message, session: &SessionId)
        -> std::result::Result<(), MessageRejectError>;
}

/// Send primitive exposed by the engine
pub trait SessionSender: Send + Sync {
    fn send_to_session(&self, message: Message, session: &SessionId) -> Result<()>;
}

/// Engine lifecycle as seen by the orchestrator
#[async_trait]
pub trait SessionEngine: Send {
    /// Begin establishing sessions
    async fn start(&mut self) -> Result<()>;

    /// Log out gracefully and release sessions
    async fn stop(&mut self) -> Result<()>;
}
