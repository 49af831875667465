//! Error types for the bridge service

use bridge_config::ConfigError;
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration rejected at startup
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A handler is already registered for this message type
    #[error("Handler already registered for message type {msg_type}")]
    DuplicateHandler {
        /// MsgType (35) value
        msg_type: String,
    },

    /// The session was replaced or logged out while a send was pending
    #[error("Session {session} is no longer active")]
    SessionInactive {
        /// Session the send was bound to
        session: String,
    },

    /// The engine refused or failed to send a message
    #[error("Send to session {session} failed: {reason}")]
    SendFailed {
        /// Target session
        session: String,
        /// Engine supplied reason
        reason: String,
    },

    /// Engine lifecycle failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// Relay dial failed
    #[error("Relay connection failed for {url}: {reason}")]
    RelayConnectionFailed {
        /// Relay endpoint
        url: String,
        /// Reason for the failure
        reason: String,
    },

    /// Relay dial did not complete in time
    #[error("Relay connection timeout for {url} after {timeout_ms}ms")]
    RelayConnectionTimeout {
        /// Relay endpoint
        url: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Reconnect budget for the current outage is spent
    #[error("Maximum reconnection attempts ({max_attempts}) exceeded for relay {url}")]
    MaxReconnectAttemptsExceeded {
        /// Relay endpoint
        url: String,
        /// Attempts that were tried
        max_attempts: u32,
    },

    /// The relay client was closed
    #[error("Relay client is closed")]
    RelayClosed,

    /// Relay endpoint is not a valid URL
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON-RPC encoding failure
    #[error("Failed to encode JSON-RPC request: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A bounded wait ran out
    #[error("Timed out after {timeout_ms}ms waiting for {operation}")]
    Timeout {
        /// What was being waited for
        operation: &'static str,
        /// Bound in milliseconds
        timeout_ms: u64,
    },

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Check if this error is recoverable through retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::SessionInactive { .. }
                | BridgeError::SendFailed { .. }
                | BridgeError::RelayConnectionFailed { .. }
                | BridgeError::RelayConnectionTimeout { .. }
                | BridgeError::WebSocket(_)
                | BridgeError::Timeout { .. }
        )
    }

    /// Check if this error indicates a permanent failure
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            BridgeError::Config(_)
                | BridgeError::DuplicateHandler { .. }
                | BridgeError::MaxReconnectAttemptsExceeded { .. }
                | BridgeError::RelayClosed
                | BridgeError::InvalidUrl(_)
        )
    }
}
