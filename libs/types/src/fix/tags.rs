//! FIX field tags used by the bridge

use super::Tag;

// Standard header
pub const BEGIN_STRING: Tag = 8;
pub const MSG_TYPE: Tag = 35;
pub const SENDER_COMP_ID: Tag = 49;
pub const TARGET_COMP_ID: Tag = 56;
pub const CLIENT_ID: Tag = 109;

// Administrative
pub const REF_SEQ_NUM: Tag = 45;
pub const TEXT: Tag = 58;
pub const SESSION_REJECT_REASON: Tag = 373;
pub const BUSINESS_REJECT_REASON: Tag = 380;
pub const USERNAME: Tag = 553;
pub const PASSWORD: Tag = 554;

// Instrument
pub const SYMBOL: Tag = 55;
pub const NO_RELATED_SYM: Tag = 146;
pub const SECURITY_REQ_ID: Tag = 320;
pub const SECURITY_REQUEST_TYPE: Tag = 321;
pub const SECURITY_RESPONSE_ID: Tag = 322;
pub const SECURITY_TRADING_STATUS: Tag = 326;

// Market data
pub const MD_REQ_ID: Tag = 262;
pub const SUBSCRIPTION_REQUEST_TYPE: Tag = 263;
pub const MARKET_DEPTH: Tag = 264;
pub const NO_MD_ENTRY_TYPES: Tag = 267;
pub const NO_MD_ENTRIES: Tag = 268;
pub const MD_ENTRY_TYPE: Tag = 269;
pub const MD_ENTRY_PX: Tag = 270;
pub const MD_ENTRY_SIZE: Tag = 271;
pub const MD_UPDATE_ACTION: Tag = 279;
pub const MD_REQ_REJ_REASON: Tag = 281;

// Execution
pub const AVG_PX: Tag = 6;
pub const LAST_PX: Tag = 31;
pub const ORD_STATUS: Tag = 39;
pub const EXEC_TYPE: Tag = 150;

/// MDEntryType (269) values
pub mod md_entry_type {
    pub const BID: &str = "0";
    pub const OFFER: &str = "1";
    pub const TRADE: &str = "2";
    pub const CLOSING: &str = "5";
    pub const SETTLEMENT: &str = "6";
    pub const HIGH: &str = "7";
    pub const LOW: &str = "8";
}

/// SecurityTradingStatus (326) values the bridge interprets
pub mod trading_status {
    pub const TRADING_HALT: &str = "2";
    pub const RESUME: &str = "3";
    pub const NO_OPEN: &str = "4";
    pub const READY_TO_TRADE: &str = "17";
    pub const NOT_AVAILABLE_FOR_TRADING: &str = "18";
}
