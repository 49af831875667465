//! Relay Output - publishes normalized prices to the pricing relay
//!
//! The relay is a JSON-RPC 2.0 service behind a WebSocket. Publishing never
//! touches the network: requests are encoded on the caller's thread and
//! queued, and a single I/O task owns the connection. That task drains the
//! queue in arrival order, answers pings, logs responses and reconnects with
//! bounded exponential backoff when the connection is lost. A connection that
//! drops before it is stable counts against the same budget as a failed dial.

use super::pending::PendingQueue;
use super::rpc::{EncodedRequest, RpcRequest, RpcResponse};
use super::PricePublisher;
use crate::request_id::{RequestCategory, RequestIds};
use crate::{BridgeError, Result};
use bridge_config::RelaySettings;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use types::PriceUpdate;
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsSource = SplitStream<WsStream>;

/// Connection states for the relay WebSocket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Not started
    Disconnected,
    /// First connection attempt in progress
    Connecting,
    /// Connected and draining the queue
    Connected,
    /// Connection lost, retrying
    Reconnecting,
    /// Reconnect budget spent; the next publish starts a new cycle
    Failed,
    /// Closed by the owner
    Closed,
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, capped
pub fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(max)
}

#[derive(Debug)]
struct Shared {
    queue: PendingQueue,
    state: Mutex<RelayState>,
    published: AtomicU64,
    messages_sent: AtomicU64,
    reconnects: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    fn set_state(&self, next: RelayState) {
        let mut state = self.state.lock();
        let previous = *state;
        if previous != next {
            *state = next;
            drop(state);
            debug!(from = ?previous, to = ?next, "Relay state changed");
        }
    }

    fn state(&self) -> RelayState {
        *self.state.lock()
    }
}

/// Client side of the pricing relay
pub struct RelayClient {
    settings: RelaySettings,
    url: Url,
    shared: Arc<Shared>,
    ids: Arc<RequestIds>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Mutex<Option<mpsc::Receiver<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RelayClient {
    /// Create a client; nothing is dialed until [`RelayClient::start`]
    pub fn new(settings: RelaySettings, ids: Arc<RequestIds>) -> Result<Self> {
        let url = Url::parse(&settings.url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(BridgeError::Config(bridge_config::ConfigError::invalid(
                "relay.url",
                format!("unsupported scheme '{}'", url.scheme()),
            )));
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Ok(Self {
            shared: Arc::new(Shared {
                queue: PendingQueue::new(settings.queue_capacity),
                state: Mutex::new(RelayState::Disconnected),
                published: AtomicU64::new(0),
                messages_sent: AtomicU64::new(0),
                reconnects: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
            settings,
            url,
            ids,
            shutdown_tx,
            shutdown_rx: Mutex::new(Some(shutdown_rx)),
            task: Mutex::new(None),
        })
    }

    /// Spawn the I/O task; requests published earlier are sent once connected
    pub fn start(&self) -> Result<()> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(BridgeError::RelayClosed);
        }
        let shutdown_rx = self
            .shutdown_rx
            .lock()
            .take()
            .ok_or_else(|| BridgeError::Internal("relay client already started".to_string()))?;

        let worker = RelayWorker {
            shared: self.shared.clone(),
            url: self.url.clone(),
            settings: self.settings.clone(),
            shutdown_rx,
        };
        *self.task.lock() = Some(tokio::spawn(worker.run()));
        Ok(())
    }

    /// Ask the relay for price pushes on `account`; returns the request id
    pub fn subscribe_price(&self, account: &str) -> Result<u64> {
        let id = self.ids.next(RequestCategory::Relay);
        self.enqueue(RpcRequest::subscribe_price(account, id)?)?;
        Ok(id)
    }

    /// Ask the relay for its product list; returns the request id
    pub fn get_product_list(&self) -> Result<u64> {
        let id = self.ids.next(RequestCategory::Relay);
        self.enqueue(RpcRequest::get_product_list(id))?;
        Ok(id)
    }

    fn enqueue(&self, request: RpcRequest) -> Result<()> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(BridgeError::RelayClosed);
        }
        let encoded = request.encode()?;
        // counted before the wakeup so a woken worker always sees it
        self.shared.published.fetch_add(1, Ordering::Release);
        if let Some(evicted) = self.shared.queue.push_back(encoded) {
            warn!(
                method = %evicted.method,
                capacity = self.shared.queue.capacity(),
                "Relay queue full, dropped oldest pending request"
            );
        }
        Ok(())
    }

    /// Close the connection
    ///
    /// Pending requests are flushed and a close frame sent; the peer gets up
    /// to `close_timeout_ms` to answer before the transport is released. The
    /// wait for the I/O task is bounded as well.
    pub async fn close(&self) -> Result<()> {
        self.shared.closed.store(true, Ordering::Release);
        let _ = self.shutdown_tx.try_send(());

        let task = self.task.lock().take();
        let Some(mut task) = task else {
            self.shared.set_state(RelayState::Closed);
            return Ok(());
        };

        let limit = self.settings.close_timeout() * 2;
        match timeout(limit, &mut task).await {
            Ok(_) => {
                info!("Relay client closed");
                Ok(())
            }
            Err(_) => {
                task.abort();
                self.shared.set_state(RelayState::Closed);
                warn!("Relay I/O task did not finish in {:?}, aborted", limit);
                Err(BridgeError::Timeout {
                    operation: "relay close",
                    timeout_ms: limit.as_millis() as u64,
                })
            }
        }
    }

    pub fn state(&self) -> RelayState {
        self.shared.state()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get statistics
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            state: self.shared.state(),
            messages_sent: self.shared.messages_sent.load(Ordering::Relaxed),
            dropped: self.shared.queue.dropped(),
            pending: self.shared.queue.len(),
            reconnects: self.shared.reconnects.load(Ordering::Relaxed),
            url: self.url.to_string(),
        }
    }
}

impl PricePublisher for RelayClient {
    fn publish(&self, update: PriceUpdate) -> Result<()> {
        let account = self.settings.account_for(&update.instrument);
        self.enqueue(RpcRequest::update_price(account, &update)?)
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

/// Statistics for the relay client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayStats {
    pub state: RelayState,
    /// Frames written to the relay
    pub messages_sent: u64,
    /// Requests discarded by the queue overflow policy
    pub dropped: u64,
    /// Requests waiting for a connection
    pub pending: usize,
    /// Connections established after the first
    pub reconnects: u64,
    pub url: String,
}

enum Dial {
    Connected(WsStream),
    Exhausted,
    Shutdown,
}

enum SessionEnd {
    /// Connection dropped; `stable` when it lived long enough to count as a
    /// recovery
    Lost { stable: bool },
    Shutdown,
}

/// Owner of the relay connection, running on its own task
struct RelayWorker {
    shared: Arc<Shared>,
    url: Url,
    settings: RelaySettings,
    shutdown_rx: mpsc::Receiver<()>,
}

impl RelayWorker {
    async fn run(mut self) {
        let mut connected_before = false;
        // failed dials plus connections lost before they became stable
        let mut failures = 0u32;

        loop {
            match self.dial(connected_before, &mut failures).await {
                Dial::Connected(ws) => {
                    if connected_before {
                        self.shared.reconnects.fetch_add(1, Ordering::Relaxed);
                    }
                    connected_before = true;
                    match self.pump(ws).await {
                        SessionEnd::Lost { stable } => {
                            if stable {
                                failures = 0;
                            }
                            failures += 1;
                            self.shared.set_state(RelayState::Reconnecting);
                        }
                        SessionEnd::Shutdown => break,
                    }
                }
                Dial::Exhausted => {
                    let seen = self.shared.published.load(Ordering::Acquire);
                    self.shared.set_state(RelayState::Failed);
                    let err = BridgeError::MaxReconnectAttemptsExceeded {
                        url: self.url.to_string(),
                        max_attempts: self.settings.max_reconnect_attempts.max(1),
                    };
                    error!("❌ {}, {} requests pending", err, self.shared.queue.len());
                    if !self.wait_for_publish(seen).await {
                        break;
                    }
                    failures = 0;
                    info!("🔄 New request queued, retrying relay connection");
                }
                Dial::Shutdown => break,
            }
        }

        self.shared.set_state(RelayState::Closed);
    }

    /// Dial until connected or until `failures` reaches the attempt budget
    ///
    /// Every attempt after a failure waits out the backoff for the failure
    /// count so far, including failures carried over from unstable
    /// connections.
    async fn dial(&mut self, reconnecting: bool, failures: &mut u32) -> Dial {
        let max_attempts = self.settings.max_reconnect_attempts.max(1);
        self.shared.set_state(if reconnecting {
            RelayState::Reconnecting
        } else {
            RelayState::Connecting
        });

        while *failures < max_attempts {
            if *failures > 0 {
                let delay = backoff_delay(
                    self.settings.base_backoff(),
                    self.settings.max_backoff(),
                    *failures,
                );
                warn!(
                    "⚠️ Relay connection failed {} time(s), retrying in {:?}",
                    failures, delay
                );
                tokio::select! {
                    _ = self.shutdown_rx.recv() => return Dial::Shutdown,
                    _ = sleep(delay) => {}
                }
            }

            info!(
                "🔌 Connecting to relay at: {} (attempt {}/{})",
                self.url,
                *failures + 1,
                max_attempts
            );

            let connect_timeout = self.settings.connect_timeout();
            let outcome = tokio::select! {
                _ = self.shutdown_rx.recv() => return Dial::Shutdown,
                outcome = timeout(connect_timeout, connect_async(self.url.as_str())) => outcome,
            };

            match outcome {
                Ok(Ok((ws, response))) => {
                    info!("✅ Connected to relay {} ({})", self.url, response.status());
                    return Dial::Connected(ws);
                }
                Ok(Err(e)) => {
                    let err = BridgeError::RelayConnectionFailed {
                        url: self.url.to_string(),
                        reason: e.to_string(),
                    };
                    warn!("{}", err);
                }
                Err(_) => {
                    let err = BridgeError::RelayConnectionTimeout {
                        url: self.url.to_string(),
                        timeout_ms: connect_timeout.as_millis() as u64,
                    };
                    warn!("{}", err);
                }
            }
            *failures += 1;
        }

        Dial::Exhausted
    }

    /// Park until more than `seen` requests have been published; `false` on
    /// shutdown
    async fn wait_for_publish(&mut self, seen: u64) -> bool {
        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => return false,
                _ = self.shared.queue.notified() => {
                    if self.shared.published.load(Ordering::Acquire) > seen {
                        return true;
                    }
                }
            }
        }
    }

    /// Drive one live connection until it is lost or shut down
    ///
    /// A connection is stable once the relay has sent a frame or it has
    /// stayed up for the maximum backoff.
    async fn pump(&mut self, ws: WsStream) -> SessionEnd {
        let (mut sink, mut source) = ws.split();
        self.shared.set_state(RelayState::Connected);
        let opened = Instant::now();
        let stable_after = self.settings.max_backoff();
        let mut heard = false;
        let lost = |heard: bool| SessionEnd::Lost {
            stable: heard || opened.elapsed() >= stable_after,
        };

        loop {
            if let Err(e) = self.drain(&mut sink).await {
                warn!("Relay send failed, reconnecting: {}", e);
                return lost(heard);
            }

            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    self.close_connection(sink, source).await;
                    return SessionEnd::Shutdown;
                }
                _ = self.shared.queue.notified() => {}
                frame = source.next() => match frame {
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!("Relay closed the connection: {:?}", frame);
                        return lost(heard);
                    }
                    Some(Ok(message)) => {
                        heard = true;
                        match message {
                            WsMessage::Text(text) => log_inbound(&text),
                            // tungstenite queues the pong itself; flushing sends it
                            WsMessage::Ping(_) => {
                                if let Err(e) = sink.flush().await {
                                    warn!("Failed to answer relay ping: {}", e);
                                    return lost(heard);
                                }
                            }
                            _ => {}
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Relay read error: {}", e);
                        return lost(heard);
                    }
                    None => {
                        warn!("Relay stream ended");
                        return lost(heard);
                    }
                },
            }
        }
    }

    /// Send everything queued, oldest first
    async fn drain(&self, sink: &mut WsSink) -> Result<()> {
        while let Some(request) = self.shared.queue.pop_front() {
            match sink.send(WsMessage::Text(request.text.clone())).await {
                Ok(()) => {
                    let total = self.shared.messages_sent.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(method = %request.method, id = ?request.id, "📨 Sent relay request #{}", total);
                    if total <= 5 || total % 1000 == 0 {
                        info!("📊 Relay stats: {} requests sent to {}", total, self.url);
                    }
                }
                Err(e) => {
                    requeue(&self.shared.queue, request);
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Flush, send a close frame and give the peer a bounded time to answer
    async fn close_connection(&self, mut sink: WsSink, mut source: WsSource) {
        let limit = self.settings.close_timeout();
        let handshake = async {
            if let Err(e) = self.drain(&mut sink).await {
                warn!("Relay flush before close failed: {}", e);
                return;
            }
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: Cow::Borrowed(""),
            };
            if let Err(e) = sink.send(WsMessage::Close(Some(frame))).await {
                warn!("Failed to send relay close frame: {}", e);
                return;
            }
            while let Some(frame) = source.next().await {
                if matches!(frame, Ok(WsMessage::Close(_)) | Err(_)) {
                    break;
                }
            }
        };

        if timeout(limit, handshake).await.is_err() {
            debug!("Relay did not finish the close handshake within {:?}", limit);
        }
        let pending = self.shared.queue.len();
        if pending > 0 {
            warn!(pending, "Relay closed with requests still pending");
        }
    }
}

fn requeue(queue: &PendingQueue, request: EncodedRequest) {
    let method = request.method.clone();
    if !queue.push_front(request) {
        warn!(method = %method, "Relay queue full, dropped request whose send failed");
    }
}

fn log_inbound(text: &str) {
    match RpcResponse::parse(text) {
        Ok(response) => match (&response.error, &response.method) {
            (Some(err), _) => warn!(
                id = ?response.id,
                code = err.code,
                "Relay returned an error: {}",
                err.message
            ),
            (None, Some(method)) => debug!(%method, params = ?response.params, "Relay notification"),
            (None, None) => debug!(id = ?response.id, result = ?response.result, "Relay response"),
        },
        Err(e) => debug!("Unparsed relay frame ({}): {}", e, text),
    }
}
