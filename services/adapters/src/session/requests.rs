//! Builders for the outbound requests the bridge originates

use bridge_config::SchedulerSettings;
use types::fix::tags;
use types::{FieldMap, Message, MsgType};

/// SecurityDefinitionRequest (35=c) issued on logon
pub fn security_definition_request(req_id: &str, request_type: &str) -> Message {
    let mut message = Message::new(MsgType::SecurityDefinitionRequest);
    message
        .body
        .set(tags::SECURITY_REQ_ID, req_id)
        .set(tags::SECURITY_REQUEST_TYPE, request_type);
    message
}

/// MarketDataRequest (35=V) for a single instrument
pub fn market_data_request(md_req_id: &str, symbol: &str, settings: &SchedulerSettings) -> Message {
    let mut message = Message::new(MsgType::MarketDataRequest);
    message
        .body
        .set(tags::MD_REQ_ID, md_req_id)
        .set(
            tags::SUBSCRIPTION_REQUEST_TYPE,
            settings.subscription_request_type.as_str(),
        )
        .set(tags::MARKET_DEPTH, settings.market_depth.to_string());

    for entry_type in &settings.entry_types {
        message.body.add_group(
            tags::NO_MD_ENTRY_TYPES,
            FieldMap::new().with(tags::MD_ENTRY_TYPE, entry_type.as_str()),
        );
    }
    message.body.add_group(
        tags::NO_RELATED_SYM,
        FieldMap::new().with(tags::SYMBOL, symbol),
    );
    message
}
