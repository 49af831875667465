//! # FIX Bridge - FIX Market Data to Pricing Relay
//!
//! ## Purpose
//!
//! Session application for an external FIX 4.2 engine. On logon it asks the
//! counterparty for its instrument list, keeps re-requesting market data for
//! every known instrument on a fixed interval, normalizes incoming snapshots,
//! incremental refreshes and execution reports into scaled integer prices,
//! and republishes them as JSON-RPC `update_price` notifications on a relay
//! WebSocket.
//!
//! ## Integration Points
//!
//! - **Input**: lifecycle callbacks and decoded messages from a FIX engine
//!   implementing [`session::SessionEngine`] and [`session::SessionSender`]
//! - **Output**: [`output::RelayClient`], a queueing JSON-RPC client with
//!   bounded reconnect
//! - **Configuration**: [`bridge_config::BridgeConfig`], validated before the
//!   engine is started
//!
//! ## Architecture Role
//!
//! ```text
//! FIX engine ──callbacks──► SessionApplication ──► MessageRouter ──► handlers
//!     ▲                          │                                  │
//!     │                   SessionHandoff                      PricePublisher
//!     │                          ▼                                  ▼
//!     └──────sends────── MarketDataScheduler                   RelayClient ──► relay
//! ```
//!
//! Engine callbacks never wait on the network: publishing only encodes and
//! queues, the relay connection is owned by one I/O task.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use fix_bridge::{PriceBridge, SessionEngine, SessionSender};
//! use std::sync::Arc;
//!
//! async fn run<E>(engine: &mut E, sender: Arc<dyn SessionSender>) -> fix_bridge::Result<()>
//! where
//!     E: SessionEngine,
//! {
//!     let (config, _credentials) = bridge_config::load_config(None, None)?;
//!     let mut bridge = PriceBridge::new(config, sender)?;
//!     // hand bridge.application() to the engine before starting it
//!     bridge
//!         .run_until(engine, async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

#![warn(clippy::all)]

pub mod bridge;
pub mod error;
pub mod output;
pub mod registry;
pub mod request_id;
pub mod scheduler;
pub mod session;

pub use bridge::PriceBridge;
pub use error::{BridgeError, Result};
pub use output::{PricePublisher, RelayClient, RelayState, RelayStats};
pub use registry::SymbolRegistry;
pub use request_id::{RequestCategory, RequestIdGenerator, RequestIds};
pub use scheduler::{MarketDataScheduler, SchedulerHandle, TickReport};
pub use session::{
    Application, MessageRouter, SessionApplication, SessionEngine, SessionHandoff, SessionSender,
    SessionState,
};
