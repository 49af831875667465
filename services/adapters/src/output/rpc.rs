//! JSON-RPC 2.0 envelope spoken on the relay WebSocket
//!
//! Request layout on the wire is `{"method","params","id","jsonrpc"}`, with
//! `params` and `id` left out when absent. Params objects are emitted with
//! their keys in lexical order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use types::PriceUpdate;

pub const JSONRPC_VERSION: &str = "2.0";

/// Relay method names
pub mod methods {
    pub const UPDATE_PRICE: &str = "update_price";
    pub const SUBSCRIBE_PRICE: &str = "subscribe_price";
    pub const GET_PRODUCT_LIST: &str = "get_product_list";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub jsonrpc: String,
}

#[derive(Debug, Clone, Serialize)]
struct UpdatePriceParams<'a> {
    account: &'a str,
    conf: u32,
    price: u64,
    status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct AccountParams<'a> {
    account: &'a str,
}

impl RpcRequest {
    fn new(method: &str, params: Option<Value>, id: Option<u64>) -> Self {
        Self {
            method: method.to_string(),
            params,
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
        }
    }

    /// `update_price` notification for `update`, published under `account`
    pub fn update_price(account: &str, update: &PriceUpdate) -> serde_json::Result<Self> {
        let params = serde_json::to_value(UpdatePriceParams {
            account,
            conf: update.confidence,
            price: update.price,
            status: update.status.as_str(),
        })?;
        Ok(Self::new(methods::UPDATE_PRICE, Some(params), None))
    }

    pub fn subscribe_price(account: &str, id: u64) -> serde_json::Result<Self> {
        let params = serde_json::to_value(AccountParams { account })?;
        Ok(Self::new(methods::SUBSCRIBE_PRICE, Some(params), Some(id)))
    }

    pub fn get_product_list(id: u64) -> Self {
        Self::new(methods::GET_PRODUCT_LIST, None, Some(id))
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    pub fn encode(&self) -> serde_json::Result<EncodedRequest> {
        Ok(EncodedRequest {
            method: self.method.clone(),
            id: self.id,
            text: serde_json::to_string(self)?,
        })
    }
}

/// A request already serialized for a text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRequest {
    pub method: String,
    pub id: Option<u64>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Response or server-initiated message received from the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
