//! Typed handlers for inbound business messages
//!
//! Handlers validate what they need and either mutate the symbol registry or
//! hand normalized prices to the relay. A relay failure is logged here and
//! never turned into a protocol reject.

use crate::output::PricePublisher;
use crate::registry::SymbolRegistry;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use types::fix::tags::{self, md_entry_type};
use types::{
    FieldMap, Message, MessageRejectError, MsgType, PriceScale, PriceUpdate, SessionId,
    TradingStatus,
};

/// Handles one or more inbound message types
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: &Message, session: &SessionId) -> Result<(), MessageRejectError>;
}

fn forward(publisher: &dyn PricePublisher, update: PriceUpdate, session: &SessionId) {
    debug!(
        session = %session,
        instrument = %update.instrument,
        price = update.price,
        confidence = update.confidence,
        status = %update.status,
        "Forwarding price update"
    );
    if let Err(e) = publisher.publish(update) {
        if e.is_permanent() {
            debug!(session = %session, "Price update discarded: {}", e);
        } else {
            warn!(session = %session, "Price update not queued for relay: {}", e);
        }
    }
}

fn out_of_range(tag: types::Tag, e: types::FixedPointError) -> MessageRejectError {
    MessageRejectError::value_is_incorrect(tag, e.to_string())
}

/// SecurityDefinition (35=d) and SecurityList (35=y)
pub struct DefinitionHandler {
    registry: Arc<SymbolRegistry>,
}

impl DefinitionHandler {
    pub fn new(registry: Arc<SymbolRegistry>) -> Self {
        Self { registry }
    }

    fn register(&self, symbol: &str, session: &SessionId) {
        if self.registry.add(symbol) {
            info!(session = %session, symbol, "New instrument discovered");
        }
    }
}

impl MessageHandler for DefinitionHandler {
    fn handle(&self, message: &Message, session: &SessionId) -> Result<(), MessageRejectError> {
        if message.msg_type() == MsgType::SecurityList {
            let entries = message.body.group(tags::NO_RELATED_SYM);
            if entries.is_empty() {
                return Err(MessageRejectError::required_tag_missing(tags::NO_RELATED_SYM));
            }
            // validate the whole list before registering any of it
            let symbols = entries
                .iter()
                .map(|entry| entry.require(tags::SYMBOL))
                .collect::<Result<Vec<_>, _>>()?;
            for symbol in symbols {
                self.register(symbol, session);
            }
            return Ok(());
        }

        let symbol = message.body.require(tags::SYMBOL)?;
        self.register(symbol, session);
        Ok(())
    }
}

/// Best bid, best offer and last traded price accumulated for one symbol
///
/// Closing and settlement prices stand in for a missing trade. Session
/// statistics such as high, low and VWAP never become the price.
#[derive(Debug, Default)]
struct Book<'a> {
    bid: Option<Decimal>,
    offer: Option<Decimal>,
    last: Option<Decimal>,
    reference: Option<Decimal>,
    status: Option<&'a str>,
}

impl<'a> Book<'a> {
    fn apply(&mut self, entry: &'a FieldMap) -> Result<(), MessageRejectError> {
        let entry_type = entry.require(tags::MD_ENTRY_TYPE)?;
        if let Some(status) = entry.get(tags::SECURITY_TRADING_STATUS) {
            self.status = Some(status);
        }
        // 279=2 removes a level and carries no usable price
        if entry.get(tags::MD_UPDATE_ACTION) == Some("2") {
            return Ok(());
        }
        let Some(px) = entry.parse::<Decimal>(tags::MD_ENTRY_PX)? else {
            return Ok(());
        };
        match entry_type {
            md_entry_type::BID => self.bid = Some(px),
            md_entry_type::OFFER => self.offer = Some(px),
            md_entry_type::TRADE => self.last = Some(px),
            md_entry_type::CLOSING | md_entry_type::SETTLEMENT => self.reference = Some(px),
            other => trace!(entry_type = other, "Ignoring statistic entry"),
        }
        Ok(())
    }

    fn normalize(
        self,
        symbol: &str,
        default_status: Option<&str>,
        scale: PriceScale,
    ) -> Result<Option<PriceUpdate>, MessageRejectError> {
        let (price, confidence) = match (self.bid, self.offer, self.last) {
            (Some(bid), Some(offer), _) => {
                if bid > offer {
                    return Err(MessageRejectError::value_is_incorrect(
                        tags::MD_ENTRY_PX,
                        format!("Crossed book for {}: bid {} above offer {}", symbol, bid, offer),
                    ));
                }
                ((bid + offer) / Decimal::TWO, (offer - bid) / Decimal::TWO)
            }
            (_, _, Some(last)) => (last, Decimal::ZERO),
            (Some(side), None, None) | (None, Some(side), None) => (side, Decimal::ZERO),
            (None, None, None) => match self.reference {
                Some(reference) => (reference, Decimal::ZERO),
                None => return Ok(None),
            },
        };

        let status = self
            .status
            .or(default_status)
            .map(TradingStatus::from_fix)
            .unwrap_or(TradingStatus::Trading);
        let price = scale
            .scale(price)
            .map_err(|e| out_of_range(tags::MD_ENTRY_PX, e))?;
        // a well-formed but very wide book the relay cannot carry
        let confidence = match scale.scale_u32(confidence) {
            Ok(confidence) => confidence,
            Err(e) => {
                warn!(symbol, "Confidence does not fit the relay, update skipped: {}", e);
                return Ok(None);
            }
        };

        Ok(Some(PriceUpdate::new(symbol, price, confidence, status)))
    }
}

/// MarketDataSnapshotFullRefresh (35=W) and MarketDataIncrementalRefresh (35=X)
pub struct MarketDataHandler {
    publisher: Arc<dyn PricePublisher>,
    scale: PriceScale,
}

impl MarketDataHandler {
    pub fn new(publisher: Arc<dyn PricePublisher>, scale: PriceScale) -> Self {
        Self { publisher, scale }
    }

    /// Normalize a refresh into one update per symbol, in order of appearance
    pub fn price_updates(&self, message: &Message) -> Result<Vec<PriceUpdate>, MessageRejectError> {
        let body = &message.body;
        let default_symbol = if message.msg_type() == MsgType::MarketDataSnapshotFullRefresh {
            Some(body.require(tags::SYMBOL)?)
        } else {
            body.get(tags::SYMBOL).filter(|symbol| !symbol.is_empty())
        };
        let default_status = body.get(tags::SECURITY_TRADING_STATUS);

        let mut books: Vec<(&str, Book<'_>)> = Vec::new();
        for entry in body.group(tags::NO_MD_ENTRIES) {
            let symbol = entry
                .get(tags::SYMBOL)
                .filter(|symbol| !symbol.is_empty())
                .or(default_symbol)
                .ok_or_else(|| MessageRejectError::required_tag_missing(tags::SYMBOL))?;

            let index = match books.iter().position(|(known, _)| *known == symbol) {
                Some(index) => index,
                None => {
                    books.push((symbol, Book::default()));
                    books.len() - 1
                }
            };
            books[index].1.apply(entry)?;
        }

        let mut updates = Vec::with_capacity(books.len());
        for (symbol, book) in books {
            if let Some(update) = book.normalize(symbol, default_status, self.scale)? {
                updates.push(update);
            }
        }
        Ok(updates)
    }
}

impl MessageHandler for MarketDataHandler {
    fn handle(&self, message: &Message, session: &SessionId) -> Result<(), MessageRejectError> {
        let updates = self.price_updates(message)?;
        if updates.is_empty() {
            debug!(session = %session, "Market data carried no priced entries");
        }
        for update in updates {
            forward(self.publisher.as_ref(), update, session);
        }
        Ok(())
    }
}

/// ExecutionReport (35=8): fills are republished as last-trade prices
pub struct ExecutionReportHandler {
    publisher: Arc<dyn PricePublisher>,
    scale: PriceScale,
}

impl ExecutionReportHandler {
    pub fn new(publisher: Arc<dyn PricePublisher>, scale: PriceScale) -> Self {
        Self { publisher, scale }
    }

    fn fill_price(body: &FieldMap) -> Result<Option<(types::Tag, Decimal)>, MessageRejectError> {
        for tag in [tags::LAST_PX, tags::AVG_PX] {
            if let Some(px) = body.parse::<Decimal>(tag)? {
                if !px.is_zero() {
                    return Ok(Some((tag, px)));
                }
            }
        }
        Ok(None)
    }
}

impl MessageHandler for ExecutionReportHandler {
    fn handle(&self, message: &Message, session: &SessionId) -> Result<(), MessageRejectError> {
        let symbol = message.body.require(tags::SYMBOL)?;
        let Some((tag, px)) = Self::fill_price(&message.body)? else {
            debug!(session = %session, symbol, "Execution report without fill price");
            return Ok(());
        };

        let price = self.scale.scale(px).map_err(|e| out_of_range(tag, e))?;
        forward(
            self.publisher.as_ref(),
            PriceUpdate::new(symbol, price, 0, TradingStatus::Trading),
            session,
        );
        Ok(())
    }
}

/// MarketDataRequestReject (35=Y) and BusinessMessageReject (35=j)
pub struct RejectNoticeHandler;

impl MessageHandler for RejectNoticeHandler {
    fn handle(&self, message: &Message, session: &SessionId) -> Result<(), MessageRejectError> {
        let body = &message.body;
        warn!(
            session = %session,
            msg_type = %message.msg_type(),
            md_req_id = body.get(tags::MD_REQ_ID).unwrap_or_default(),
            reason = body
                .get(tags::MD_REQ_REJ_REASON)
                .or_else(|| body.get(tags::BUSINESS_REJECT_REASON))
                .unwrap_or_default(),
            text = body.get(tags::TEXT).unwrap_or_default(),
            "Counterparty rejected a request"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeError;
    use parking_lot::Mutex;
    use types::RejectReason;

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<PriceUpdate>>,
        fail: bool,
    }

    impl PricePublisher for Recorder {
        fn publish(&self, update: PriceUpdate) -> crate::Result<()> {
            if self.fail {
                return Err(BridgeError::RelayClosed);
            }
            self.updates.lock().push(update);
            Ok(())
        }
    }

    fn session() -> SessionId {
        SessionId::new("FIX.4.2", "TESTBUY1", "TESTSELL1")
    }

    fn entry(entry_type: &str, px: &str) -> FieldMap {
        FieldMap::new()
            .with(tags::MD_ENTRY_TYPE, entry_type)
            .with(tags::MD_ENTRY_PX, px)
    }

    fn snapshot(symbol: &str, entries: Vec<FieldMap>) -> Message {
        let mut message = Message::new(MsgType::MarketDataSnapshotFullRefresh);
        message.body.set(tags::SYMBOL, symbol);
        for e in entries {
            message.body.add_group(tags::NO_MD_ENTRIES, e);
        }
        message
    }

    fn market_data(recorder: &Arc<Recorder>) -> MarketDataHandler {
        MarketDataHandler::new(recorder.clone(), PriceScale::new(5))
    }

    #[test]
    fn test_definition_registers_symbol() {
        let registry = Arc::new(SymbolRegistry::new());
        let handler = DefinitionHandler::new(registry.clone());

        let mut message = Message::new(MsgType::SecurityDefinition);
        message.body.set(tags::SYMBOL, "LNUX");
        handler.handle(&message, &session()).unwrap();
        handler.handle(&message, &session()).unwrap();

        assert_eq!(registry.snapshot(), vec!["LNUX"]);
    }

    #[test]
    fn test_definition_without_symbol_rejected() {
        let handler = DefinitionHandler::new(Arc::new(SymbolRegistry::new()));
        let err = handler
            .handle(&Message::new(MsgType::SecurityDefinition), &session())
            .unwrap_err();
        assert_eq!(err.reason, RejectReason::RequiredTagMissing);
        assert_eq!(err.ref_tag, Some(tags::SYMBOL));
    }

    #[test]
    fn test_security_list_registers_every_entry() {
        let registry = Arc::new(SymbolRegistry::new());
        let handler = DefinitionHandler::new(registry.clone());

        let mut message = Message::new(MsgType::SecurityList);
        for symbol in ["LNUX", "BCHUSD"] {
            message
                .body
                .add_group(tags::NO_RELATED_SYM, FieldMap::new().with(tags::SYMBOL, symbol));
        }
        handler.handle(&message, &session()).unwrap();
        assert_eq!(registry.snapshot(), vec!["BCHUSD", "LNUX"]);

        // one bad entry rejects the whole list
        let mut bad = Message::new(MsgType::SecurityList);
        bad.body
            .add_group(tags::NO_RELATED_SYM, FieldMap::new().with(tags::SYMBOL, "SOLUSD"))
            .add_group(tags::NO_RELATED_SYM, FieldMap::new());
        assert!(handler.handle(&bad, &session()).is_err());
        assert!(!registry.contains("SOLUSD"));
    }

    #[test]
    fn test_bid_offer_produce_mid_and_half_spread() {
        let recorder = Arc::new(Recorder::default());
        let handler = market_data(&recorder);

        let message = snapshot(
            "LNUX",
            vec![
                entry(md_entry_type::BID, "1691.9"),
                entry(md_entry_type::OFFER, "1706.5"),
            ],
        );
        handler.handle(&message, &session()).unwrap();

        let updates = recorder.updates.lock();
        assert_eq!(
            *updates,
            vec![PriceUpdate::new(
                "LNUX",
                169_920_000,
                730_000,
                TradingStatus::Trading
            )]
        );
    }

    #[test]
    fn test_single_trade_entry_has_zero_confidence() {
        let recorder = Arc::new(Recorder::default());
        let handler = market_data(&recorder);

        let mut message = snapshot("LNUX", vec![entry(md_entry_type::TRADE, "1700")]);
        message.body.set(tags::SECURITY_TRADING_STATUS, "2");
        handler.handle(&message, &session()).unwrap();

        let updates = recorder.updates.lock();
        assert_eq!(updates[0].price, 170_000_000);
        assert_eq!(updates[0].confidence, 0);
        assert_eq!(updates[0].status, TradingStatus::Halted);
    }

    #[test]
    fn test_statistic_entries_do_not_replace_trade() {
        let recorder = Arc::new(Recorder::default());
        let handler = market_data(&recorder);

        let message = snapshot(
            "LNUX",
            vec![
                entry(md_entry_type::TRADE, "1700"),
                entry(md_entry_type::HIGH, "1800"),
                entry(md_entry_type::LOW, "1600"),
            ],
        );
        handler.handle(&message, &session()).unwrap();

        let updates = recorder.updates.lock();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].price, 170_000_000);
        assert_eq!(updates[0].confidence, 0);
    }

    #[test]
    fn test_closing_price_used_without_trade() {
        let handler = market_data(&Arc::new(Recorder::default()));

        let message = snapshot(
            "LNUX",
            vec![
                entry(md_entry_type::HIGH, "1800"),
                entry(md_entry_type::CLOSING, "1650.25"),
            ],
        );
        assert_eq!(
            handler.price_updates(&message).unwrap(),
            vec![PriceUpdate::new("LNUX", 165_025_000, 0, TradingStatus::Trading)]
        );

        let stats_only = snapshot(
            "LNUX",
            vec![
                entry(md_entry_type::HIGH, "1800"),
                entry(md_entry_type::LOW, "1600"),
            ],
        );
        assert!(handler.price_updates(&stats_only).unwrap().is_empty());
    }

    #[test]
    fn test_unrepresentable_confidence_skipped_not_rejected() {
        let recorder = Arc::new(Recorder::default());
        let handler = market_data(&recorder);

        // half-spread 45000 scales past u32::MAX at exponent 5
        let message = snapshot(
            "LNUX",
            vec![
                entry(md_entry_type::BID, "1"),
                entry(md_entry_type::OFFER, "90001"),
            ],
        );
        assert!(handler.handle(&message, &session()).is_ok());
        assert!(recorder.updates.lock().is_empty());
    }

    #[test]
    fn test_crossed_book_rejected() {
        let recorder = Arc::new(Recorder::default());
        let handler = market_data(&recorder);

        let message = snapshot(
            "LNUX",
            vec![
                entry(md_entry_type::BID, "1710"),
                entry(md_entry_type::OFFER, "1706.5"),
            ],
        );
        let err = handler.handle(&message, &session()).unwrap_err();
        assert_eq!(err.reason, RejectReason::ValueIsIncorrect);
        assert_eq!(err.ref_tag, Some(tags::MD_ENTRY_PX));
        assert!(recorder.updates.lock().is_empty());
    }

    #[test]
    fn test_snapshot_requires_symbol_and_entry_type() {
        let handler = market_data(&Arc::new(Recorder::default()));

        let mut message = Message::new(MsgType::MarketDataSnapshotFullRefresh);
        message
            .body
            .add_group(tags::NO_MD_ENTRIES, entry(md_entry_type::BID, "1"));
        let err = handler.handle(&message, &session()).unwrap_err();
        assert_eq!(err.ref_tag, Some(tags::SYMBOL));

        let message = snapshot(
            "LNUX",
            vec![FieldMap::new().with(tags::MD_ENTRY_PX, "1")],
        );
        let err = handler.handle(&message, &session()).unwrap_err();
        assert_eq!(err.ref_tag, Some(tags::MD_ENTRY_TYPE));
    }

    #[test]
    fn test_malformed_price_rejected() {
        let handler = market_data(&Arc::new(Recorder::default()));
        let message = snapshot("LNUX", vec![entry(md_entry_type::BID, "1691,9")]);
        let err = handler.handle(&message, &session()).unwrap_err();
        assert_eq!(err.reason, RejectReason::IncorrectDataFormat);
    }

    #[test]
    fn test_incremental_refresh_groups_by_symbol() {
        let handler = market_data(&Arc::new(Recorder::default()));

        let mut message = Message::new(MsgType::MarketDataIncrementalRefresh);
        message
            .body
            .add_group(
                tags::NO_MD_ENTRIES,
                entry(md_entry_type::BID, "10").with(tags::SYMBOL, "AAA"),
            )
            .add_group(
                tags::NO_MD_ENTRIES,
                entry(md_entry_type::TRADE, "20.5")
                    .with(tags::SYMBOL, "BBB")
                    .with(tags::SECURITY_TRADING_STATUS, "17"),
            )
            .add_group(
                tags::NO_MD_ENTRIES,
                entry(md_entry_type::OFFER, "11").with(tags::SYMBOL, "AAA"),
            )
            .add_group(
                tags::NO_MD_ENTRIES,
                FieldMap::new()
                    .with(tags::SYMBOL, "CCC")
                    .with(tags::MD_ENTRY_TYPE, md_entry_type::BID)
                    .with(tags::MD_UPDATE_ACTION, "2"),
            );

        let updates = handler.price_updates(&message).unwrap();
        assert_eq!(
            updates,
            vec![
                PriceUpdate::new("AAA", 1_050_000, 50_000, TradingStatus::Trading),
                PriceUpdate::new("BBB", 2_050_000, 0, TradingStatus::Trading),
            ]
        );
    }

    #[test]
    fn test_relay_failure_is_not_a_reject() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let handler = market_data(&recorder);
        let message = snapshot("LNUX", vec![entry(md_entry_type::TRADE, "1")]);
        assert!(handler.handle(&message, &session()).is_ok());
    }

    #[test]
    fn test_execution_report_uses_last_px_then_avg_px() {
        let recorder = Arc::new(Recorder::default());
        let handler = ExecutionReportHandler::new(recorder.clone(), PriceScale::new(5));

        let mut report = Message::new(MsgType::ExecutionReport);
        report
            .body
            .set(tags::SYMBOL, "LNUX")
            .set(tags::LAST_PX, "0")
            .set(tags::AVG_PX, "1699.2");
        handler.handle(&report, &session()).unwrap();

        let mut unfilled = Message::new(MsgType::ExecutionReport);
        unfilled.body.set(tags::SYMBOL, "LNUX");
        handler.handle(&unfilled, &session()).unwrap();

        let updates = recorder.updates.lock();
        assert_eq!(
            *updates,
            vec![PriceUpdate::new(
                "LNUX",
                169_920_000,
                0,
                TradingStatus::Trading
            )]
        );
    }

    #[test]
    fn test_reject_notice_is_accepted() {
        let mut message = Message::new(MsgType::MarketDataRequestReject);
        message
            .body
            .set(tags::MD_REQ_ID, "4")
            .set(tags::MD_REQ_REJ_REASON, "0");
        assert!(RejectNoticeHandler.handle(&message, &session()).is_ok());
    }
}
