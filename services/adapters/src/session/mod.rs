//! FIX session side of the bridge
//!
//! - [`engine`]: the contract with the external FIX engine
//! - [`application`]: lifecycle callbacks and inbound delegation
//! - [`router`] / [`handlers`]: per-MsgType processing of business messages
//! - [`handoff`]: single-slot channel carrying the active session
//! - [`requests`]: builders for the requests the bridge originates

pub mod application;
pub mod engine;
pub mod handlers;
pub mod handoff;
pub mod requests;
pub mod router;

pub use application::{SessionApplication, SessionState};
pub use engine::{Application, SessionEngine, SessionSender};
pub use handlers::MessageHandler;
pub use handoff::SessionHandoff;
pub use router::{MessageRouter, RouteError};
