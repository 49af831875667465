//! Output side of the bridge: delivery of normalized prices to the pricing relay
//!
//! Handlers only see the [`PricePublisher`] seam; the WebSocket JSON-RPC
//! client behind it lives in [`relay_output`].

pub mod pending;
pub mod relay_output;
pub mod rpc;

pub use pending::PendingQueue;
pub use relay_output::{backoff_delay, RelayClient, RelayState, RelayStats};
pub use rpc::{EncodedRequest, RpcError, RpcRequest, RpcResponse};

use crate::Result;
use types::PriceUpdate;

/// Sink for normalized price observations
///
/// `publish` is called from engine callback threads: it must not block on
/// network I/O. An error means the update was not accepted for delivery.
pub trait PricePublisher: Send + Sync {
    fn publish(&self, update: PriceUpdate) -> Result<()>;
}
