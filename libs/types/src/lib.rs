//! # FIX Bridge Types Library
//!
//! Shared type definitions for the FIX pricing bridge.
//!
//! ## Design Philosophy
//!
//! - **Engine Boundary Types**: [`fix::Message`], [`fix::SessionId`] and
//!   [`fix::MessageRejectError`] model what the external FIX engine hands to
//!   the application, without re-implementing the session protocol
//! - **No Precision Loss**: Prices are parsed as decimals and stored as scaled
//!   integers, never routed through `f64`
//! - **Clear Boundaries**: Conversion from FIX decimal strings to fixed-point
//!   happens in exactly one place ([`common::fixed_point::PriceScale`])
//!
//! ## Quick Start
//!
//! ```rust
//! use types::fix::{tags, Message, MsgType};
//!
//! let mut request = Message::new(MsgType::SecurityDefinitionRequest);
//! request.body.set(tags::SECURITY_REQ_ID, "1");
//! assert_eq!(request.msg_type(), MsgType::SecurityDefinitionRequest);
//! ```
//!
//! ```rust
//! use types::{PriceScale, PriceUpdate, TradingStatus};
//!
//! let scale = PriceScale::new(5);
//! let price = scale.scale_str("1699.2").unwrap();
//! let update = PriceUpdate::new("LNUX", price, 730_000, TradingStatus::Trading);
//! assert_eq!(update.price, 169_920_000);
//! ```

pub mod fix;

#[cfg(feature = "common")]
pub mod common;

#[cfg(feature = "common")]
pub mod price;

pub use fix::{FieldMap, Message, MessageRejectError, MsgType, RejectReason, SessionId, Tag};

#[cfg(feature = "common")]
pub use common::{errors::FixedPointError, fixed_point::PriceScale};

#[cfg(feature = "common")]
pub use price::{PriceUpdate, TradingStatus};
