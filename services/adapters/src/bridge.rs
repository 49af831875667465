//! Orchestration of the bridge components
//!
//! [`PriceBridge::new`] validates the whole configuration before anything is
//! spawned, so a missing credential is reported before the engine ever
//! attempts a session. Shutdown runs in a fixed order: scheduler, engine,
//! relay, each step bounded by `shutdown_timeout_ms`.

use crate::output::{RelayClient, RelayStats};
use crate::registry::SymbolRegistry;
use crate::request_id::RequestIds;
use crate::scheduler::{MarketDataScheduler, SchedulerHandle};
use crate::session::{
    MessageRouter, SessionApplication, SessionEngine, SessionHandoff, SessionSender,
};
use crate::{BridgeError, Result};
use bridge_config::BridgeConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub struct PriceBridge {
    config: BridgeConfig,
    registry: Arc<SymbolRegistry>,
    handoff: SessionHandoff,
    relay: Arc<RelayClient>,
    application: Arc<SessionApplication>,
    scheduler: Arc<MarketDataScheduler>,
    scheduler_handle: Option<SchedulerHandle>,
}

impl PriceBridge {
    /// Validate `config` and wire the components
    ///
    /// `sender` is the engine's send primitive, shared by the application
    /// and the scheduler.
    pub fn new(config: BridgeConfig, sender: Arc<dyn SessionSender>) -> Result<Self> {
        let credentials = config.validate()?;
        match config.render() {
            Ok(rendered) => debug!("Effective configuration:\n{}", rendered),
            Err(e) => debug!("Configuration not renderable: {}", e),
        }

        let ids = Arc::new(RequestIds::new());
        let registry = Arc::new(SymbolRegistry::new());
        let handoff = SessionHandoff::new();
        let relay = Arc::new(RelayClient::new(config.relay.clone(), ids.clone())?);

        let router = MessageRouter::with_default_handlers(
            registry.clone(),
            relay.clone(),
            config.pricing.scale(),
        )?;
        let application = Arc::new(SessionApplication::new(
            credentials,
            router,
            handoff.clone(),
            sender.clone(),
            ids.clone(),
        ));
        let scheduler = Arc::new(MarketDataScheduler::new(
            config.scheduler.clone(),
            registry.clone(),
            sender,
            handoff.clone(),
            ids,
        ));

        Ok(Self {
            config,
            registry,
            handoff,
            relay,
            application,
            scheduler,
            scheduler_handle: None,
        })
    }

    /// Callback target to register with the engine
    pub fn application(&self) -> Arc<SessionApplication> {
        self.application.clone()
    }

    pub fn registry(&self) -> &Arc<SymbolRegistry> {
        &self.registry
    }

    pub fn handoff(&self) -> &SessionHandoff {
        &self.handoff
    }

    pub fn relay(&self) -> &Arc<RelayClient> {
        &self.relay
    }

    pub fn relay_stats(&self) -> RelayStats {
        self.relay.stats()
    }

    fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.config.shutdown_timeout_ms)
    }

    /// Start the relay and the scheduler, then the engine
    pub async fn start<E>(&mut self, engine: &mut E) -> Result<()>
    where
        E: SessionEngine + ?Sized,
    {
        if self.scheduler_handle.is_some() {
            return Err(BridgeError::Internal("bridge already started".to_string()));
        }

        self.relay.start()?;
        self.scheduler_handle = Some(self.scheduler.clone().spawn());

        info!(
            relay = %self.relay.url(),
            interval = ?self.config.scheduler.interval(),
            "Starting FIX engine"
        );
        if let Err(e) = engine.start().await {
            warn!("Engine failed to start: {}", e);
            self.stop_components().await;
            return Err(e);
        }
        Ok(())
    }

    /// Ordered shutdown: scheduler, engine, relay
    pub async fn shutdown<E>(&mut self, engine: &mut E) -> Result<()>
    where
        E: SessionEngine + ?Sized,
    {
        let limit = self.step_timeout();
        info!("Shutting down bridge");

        if let Some(handle) = self.scheduler_handle.take() {
            if let Err(e) = handle.stop(limit).await {
                warn!("Scheduler stop: {}", e);
            }
        }

        match timeout(limit, engine.stop()).await {
            Ok(Ok(())) => info!("FIX engine stopped"),
            Ok(Err(e)) => warn!("FIX engine stop failed: {}", e),
            Err(_) => warn!("FIX engine did not stop within {:?}", limit),
        }

        if let Err(e) = self.relay.close().await {
            warn!("Relay close: {}", e);
        }

        info!(stats = ?self.relay.stats(), "Bridge stopped");
        Ok(())
    }

    /// Start, wait for `shutdown_signal`, then shut down
    pub async fn run_until<E, F>(&mut self, engine: &mut E, shutdown_signal: F) -> Result<()>
    where
        E: SessionEngine + ?Sized,
        F: Future<Output = ()>,
    {
        self.start(engine).await?;
        shutdown_signal.await;
        self.shutdown(engine).await
    }

    async fn stop_components(&mut self) {
        if let Some(handle) = self.scheduler_handle.take() {
            if let Err(e) = handle.stop(self.step_timeout()).await {
                warn!("Scheduler stop: {}", e);
            }
        }
        if let Err(e) = self.relay.close().await {
            warn!("Relay close: {}", e);
        }
    }
}
