//! FIX engine boundary types
//!
//! The session protocol itself (framing, sequence numbers, resends) belongs to
//! the external engine. These types only describe what crosses the callback
//! boundary: decoded messages, session identity and reject results.

pub mod message;
pub mod msg_type;
pub mod reject;
pub mod session;
pub mod tags;

pub use message::{FieldMap, Message};
pub use msg_type::MsgType;
pub use reject::{MessageRejectError, RejectReason};
pub use session::SessionId;

/// FIX field tag number
pub type Tag = u32;
