//! Normalized price observations handed to the pricing relay

use crate::fix::tags::trading_status;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tradeability of an instrument as reported to the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingStatus {
    Trading,
    Halted,
    Unknown,
}

impl TradingStatus {
    /// Relay wire value
    pub fn as_str(self) -> &'static str {
        match self {
            TradingStatus::Trading => "trading",
            TradingStatus::Halted => "halted",
            TradingStatus::Unknown => "unknown",
        }
    }

    /// Interpret a SecurityTradingStatus (326) value
    pub fn from_fix(value: &str) -> Self {
        match value {
            trading_status::READY_TO_TRADE | trading_status::RESUME => TradingStatus::Trading,
            trading_status::TRADING_HALT
            | trading_status::NO_OPEN
            | trading_status::NOT_AVAILABLE_FOR_TRADING => TradingStatus::Halted,
            _ => TradingStatus::Unknown,
        }
    }
}

impl fmt::Display for TradingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized price observation
///
/// `price` and `confidence` are fixed-point integers scaled by the bridge's
/// configured [`crate::PriceScale`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub instrument: String,
    pub price: u64,
    pub confidence: u32,
    pub status: TradingStatus,
}

impl PriceUpdate {
    pub fn new(
        instrument: impl Into<String>,
        price: u64,
        confidence: u32,
        status: TradingStatus,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            price,
            confidence,
            status,
        }
    }
}
