//! Periodic market data re-subscription
//!
//! The scheduler is `Idle` until the session handoff holds a session, then
//! `Armed`: it waits one full interval and afterwards sends one
//! MarketDataRequest per known instrument on every tick. Any change in the
//! handoff disarms it; a new session re-arms it with a fresh interval.

use crate::registry::SymbolRegistry;
use crate::request_id::{RequestCategory, RequestIds};
use crate::session::engine::SessionSender;
use crate::session::handoff::SessionHandoff;
use crate::session::requests::market_data_request;
use crate::{BridgeError, Result};
use bridge_config::SchedulerSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use types::SessionId;

/// Outcome of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Requests accepted by the engine
    pub sent: usize,
    /// Requests the engine refused
    pub failed: usize,
    /// Instruments not requested because the session stopped being active
    pub skipped: usize,
}

pub struct MarketDataScheduler {
    settings: SchedulerSettings,
    registry: Arc<SymbolRegistry>,
    sender: Arc<dyn SessionSender>,
    handoff: SessionHandoff,
    ids: Arc<RequestIds>,
}

impl MarketDataScheduler {
    pub fn new(
        settings: SchedulerSettings,
        registry: Arc<SymbolRegistry>,
        sender: Arc<dyn SessionSender>,
        handoff: SessionHandoff,
        ids: Arc<RequestIds>,
    ) -> Self {
        Self {
            settings,
            registry,
            sender,
            handoff,
            ids,
        }
    }

    /// Request market data for every selected instrument on `session`
    ///
    /// Each send is preceded by a check that `session` is still the active
    /// session; once it is not, the remaining instruments are skipped.
    pub fn tick(&self, session: &SessionId) -> TickReport {
        let symbols = self.registry.snapshot_filtered(&self.settings.watch_list);
        let mut report = TickReport::default();

        for symbol in symbols {
            if !self.handoff.is_active(session) {
                report.skipped += 1;
                continue;
            }

            let md_req_id = self.ids.next_field(RequestCategory::MarketData);
            let request = market_data_request(&md_req_id, &symbol, &self.settings);
            match self.sender.send_to_session(request, session) {
                Ok(()) => {
                    report.sent += 1;
                    debug!(session = %session, %symbol, %md_req_id, "Market data request sent");
                }
                Err(e) => {
                    report.failed += 1;
                    if e.is_recoverable() {
                        warn!(session = %session, %symbol, "Market data request failed: {}", e);
                    } else {
                        error!(session = %session, %symbol, "Market data request failed: {}", e);
                    }
                }
            }
        }

        report
    }

    /// Run the scheduler on its own task
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle { shutdown_tx, task }
    }

    async fn run(self: Arc<Self>, mut shutdown_rx: mpsc::Receiver<()>) {
        let mut sessions = self.handoff.subscribe();
        let period = self.settings.interval();

        loop {
            // Idle
            let session = loop {
                let current = sessions.borrow_and_update().clone();
                if let Some(session) = current {
                    break session;
                }
                tokio::select! {
                    _ = shutdown_rx.recv() => return,
                    changed = sessions.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            };

            info!(session = %session, interval = ?period, "Market data scheduler armed");
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // Armed
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => return,
                    changed = sessions.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        info!(session = %session, "Session changed, market data scheduler disarmed");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = self.tick(&session);
                        if report.failed > 0 || report.skipped > 0 {
                            warn!(session = %session, ?report, "Market data tick incomplete");
                        } else {
                            debug!(session = %session, sent = report.sent, "Market data tick");
                        }
                    }
                }
            }
        }
    }
}

/// Stop handle for a spawned scheduler
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the scheduler and wait up to `limit` for it to finish
    ///
    /// The task is aborted if it does not finish in time.
    pub async fn stop(mut self, limit: Duration) -> Result<()> {
        let _ = self.shutdown_tx.try_send(());
        match timeout(limit, &mut self.task).await {
            Ok(Ok(())) => {
                info!("Market data scheduler stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(BridgeError::Internal(format!("scheduler task failed: {}", e))),
            Err(_) => {
                self.task.abort();
                Err(BridgeError::Timeout {
                    operation: "market data scheduler",
                    timeout_ms: limit.as_millis() as u64,
                })
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
