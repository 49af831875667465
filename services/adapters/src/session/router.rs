//! Dispatch of inbound business messages by MsgType

use super::handlers::{
    DefinitionHandler, ExecutionReportHandler, MarketDataHandler, MessageHandler,
    RejectNoticeHandler,
};
use crate::output::PricePublisher;
use crate::registry::SymbolRegistry;
use crate::{BridgeError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use types::{Message, MessageRejectError, MsgType, PriceScale, SessionId};

/// Why a message could not be routed to a successful handler result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Unsupported message type {0}")]
    UnsupportedMessageType(MsgType),

    #[error(transparent)]
    Reject(#[from] MessageRejectError),
}

#[derive(Default)]
pub struct MessageRouter {
    handlers: HashMap<MsgType, Arc<dyn MessageHandler>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the bridge's handlers for definitions, market data,
    /// execution reports and reject notices
    pub fn with_default_handlers(
        registry: Arc<SymbolRegistry>,
        publisher: Arc<dyn PricePublisher>,
        scale: PriceScale,
    ) -> Result<Self> {
        let mut router = Self::new();

        let definitions: Arc<dyn MessageHandler> = Arc::new(DefinitionHandler::new(registry));
        router.register(MsgType::SecurityDefinition, definitions.clone())?;
        router.register(MsgType::SecurityList, definitions)?;

        let market_data: Arc<dyn MessageHandler> =
            Arc::new(MarketDataHandler::new(publisher.clone(), scale));
        router.register(MsgType::MarketDataSnapshotFullRefresh, market_data.clone())?;
        router.register(MsgType::MarketDataIncrementalRefresh, market_data)?;

        router.register(
            MsgType::ExecutionReport,
            Arc::new(ExecutionReportHandler::new(publisher, scale)),
        )?;

        let notices: Arc<dyn MessageHandler> = Arc::new(RejectNoticeHandler);
        router.register(MsgType::MarketDataRequestReject, notices.clone())?;
        router.register(MsgType::BusinessMessageReject, notices)?;

        Ok(router)
    }

    /// Register `handler` for `msg_type`; each type has at most one handler
    pub fn register(&mut self, msg_type: MsgType, handler: Arc<dyn MessageHandler>) -> Result<()> {
        if self.handlers.contains_key(&msg_type) {
            return Err(BridgeError::DuplicateHandler {
                msg_type: msg_type.to_string(),
            });
        }
        self.handlers.insert(msg_type, handler);
        Ok(())
    }

    pub fn handles(&self, msg_type: &MsgType) -> bool {
        self.handlers.contains_key(msg_type)
    }

    pub fn dispatch(
        &self,
        message: &Message,
        session: &SessionId,
    ) -> std::result::Result<(), RouteError> {
        let msg_type = message.msg_type();
        match self.handlers.get(&msg_type) {
            Some(handler) => handler.handle(message, session).map_err(RouteError::from),
            None => Err(RouteError::UnsupportedMessageType(msg_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeError;
    use types::fix::tags;
    use types::PriceUpdate;

    struct Discard;

    impl PricePublisher for Discard {
        fn publish(&self, _update: PriceUpdate) -> crate::Result<()> {
            Ok(())
        }
    }

    fn session() -> SessionId {
        SessionId::new("FIX.4.2", "TESTBUY1", "TESTSELL1")
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut router = MessageRouter::new();
        router
            .register(MsgType::ExecutionReport, Arc::new(RejectNoticeHandler))
            .unwrap();
        let err = router
            .register(MsgType::ExecutionReport, Arc::new(RejectNoticeHandler))
            .unwrap_err();
        assert!(matches!(err, BridgeError::DuplicateHandler { msg_type } if msg_type == "8"));
    }

    #[test]
    fn test_dispatch_routes_by_type() {
        let registry = Arc::new(SymbolRegistry::new());
        let router =
            MessageRouter::with_default_handlers(registry.clone(), Arc::new(Discard), PriceScale::default())
                .unwrap();

        let mut definition = Message::new(MsgType::SecurityDefinition);
        definition.body.set(tags::SYMBOL, "LNUX");
        router.dispatch(&definition, &session()).unwrap();
        assert!(registry.contains("LNUX"));

        let unknown = Message::new(MsgType::from("UZ"));
        assert_eq!(
            router.dispatch(&unknown, &session()),
            Err(RouteError::UnsupportedMessageType(MsgType::from("UZ")))
        );
        assert!(router.handles(&MsgType::MarketDataIncrementalRefresh));
        assert!(!router.handles(&MsgType::Heartbeat));
    }

    #[test]
    fn test_handler_reject_passes_through() {
        let router = MessageRouter::with_default_handlers(
            Arc::new(SymbolRegistry::new()),
            Arc::new(Discard),
            PriceScale::default(),
        )
        .unwrap();

        let err = router
            .dispatch(&Message::new(MsgType::SecurityDefinition), &session())
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::Reject(MessageRejectError::required_tag_missing(tags::SYMBOL))
        );
    }
}
