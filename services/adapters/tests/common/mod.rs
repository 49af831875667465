//! Shared fixtures for the bridge integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_config::{keys, BridgeConfig, SessionSettings};
use fix_bridge::{BridgeError, Result, SessionEngine, SessionHandoff, SessionSender};
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use types::fix::tags;
use types::{Message, MsgType, SessionId};

pub const ACCOUNT: &str = "33ugpDWbC2mLrYSQvu1BHfykR8bt3MVc4S3YuuXMVRH3";

const WAIT: Duration = Duration::from_secs(5);

pub fn session(target: &str) -> SessionId {
    SessionId::new("FIX.4.2", "TESTBUY1", target)
}

/// Valid configuration pointing the relay at `relay_url`
pub fn valid_config(relay_url: &str) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.session = SessionSettings::new()
        .with(keys::SENDER_COMP_ID, "TESTBUY1")
        .with(keys::TARGET_COMP_ID, "TESTSELL1")
        .with(keys::PASSWORD, "secret");
    config.relay.url = relay_url.to_string();
    config.relay.connect_timeout_ms = 500;
    config.relay.base_backoff_ms = 10;
    config.relay.max_backoff_ms = 50;
    config.relay.max_reconnect_attempts = 3;
    config.relay.close_timeout_ms = 500;
    config
        .relay
        .accounts
        .insert("LNUX".to_string(), ACCOUNT.to_string());
    config.shutdown_timeout_ms = 2_000;
    config
}

/// Stand-in for the FIX engine's send primitive
///
/// Refuses sends for sessions that are no longer active, like an engine
/// whose session was torn down.
pub struct EngineSender {
    handoff: Mutex<Option<SessionHandoff>>,
    sent: Mutex<Vec<(Message, SessionId)>>,
    logout_on_market_data: Mutex<bool>,
}

impl EngineSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handoff: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            logout_on_market_data: Mutex::new(false),
        })
    }

    pub fn attach(&self, handoff: SessionHandoff) {
        *self.handoff.lock() = Some(handoff);
    }

    /// Simulate a logout racing the next market data request
    pub fn logout_on_next_market_data(&self) {
        *self.logout_on_market_data.lock() = true;
    }

    pub fn sent(&self) -> Vec<(Message, SessionId)> {
        self.sent.lock().clone()
    }

    pub fn sent_of(&self, msg_type: MsgType) -> Vec<(Message, SessionId)> {
        self.sent()
            .into_iter()
            .filter(|(message, _)| message.msg_type() == msg_type)
            .collect()
    }

    /// Symbols of the market data requests sent so far
    pub fn requested_symbols(&self) -> Vec<String> {
        self.sent_of(MsgType::MarketDataRequest)
            .iter()
            .filter_map(|(message, _)| {
                message
                    .body
                    .group(tags::NO_RELATED_SYM)
                    .first()
                    .and_then(|entry| entry.get(tags::SYMBOL))
                    .map(str::to_string)
            })
            .collect()
    }
}

impl SessionSender for EngineSender {
    fn send_to_session(&self, message: Message, session: &SessionId) -> Result<()> {
        let handoff = self.handoff.lock().clone();
        if let Some(handoff) = handoff {
            if message.msg_type() == MsgType::MarketDataRequest
                && std::mem::take(&mut *self.logout_on_market_data.lock())
            {
                handoff.clear(session);
            }
            if !handoff.is_active(session) {
                return Err(BridgeError::SessionInactive {
                    session: session.to_string(),
                });
            }
        }
        self.sent.lock().push((message, session.clone()));
        Ok(())
    }
}

/// Engine lifecycle stub
#[derive(Default)]
pub struct StubEngine {
    pub started: bool,
    pub stopped: bool,
}

#[async_trait]
impl SessionEngine for StubEngine {
    async fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.stopped = true;
        Ok(())
    }
}

/// Local WebSocket endpoint standing in for the pricing relay
pub struct RelayServer {
    listener: TcpListener,
    pub url: String,
}

impl RelayServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/", listener.local_addr().unwrap());
        Self { listener, url }
    }

    pub async fn accept(&self) -> WebSocketStream<TcpStream> {
        let (stream, _) = timeout(WAIT, self.listener.accept())
            .await
            .expect("relay client never connected")
            .unwrap();
        tokio_tungstenite::accept_async(stream).await.unwrap()
    }
}

/// Next text frame from the client
pub async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("expected a text frame, got {:?}", other),
            }
        }
    })
    .await
    .expect("no text frame received")
}

/// Poll `condition` until it holds
pub async fn eventually(condition: impl Fn() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}
