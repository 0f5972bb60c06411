//! Poller: drives the collect → evaluate → notify → publish cycle.
//!
//! ## Cycle
//!
//! ```text
//! tick ─┬─ agent 1: collect ─ store ─ evaluate ─ notify/publish alerts
//!       ├─ agent 2: ...
//!       └─ agent N: ...
//!            ↓ join
//!       publish metrics_update (full state)
//! ```
//!
//! Every agent runs in its own task, so a slow or unreachable host only
//! delays its own result. Alert evaluation happens under the alert-set
//! write lock; sends and publishes happen after it is released.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, instrument, warn};

use crate::Metrics;
use crate::alerts::{ActiveAlerts, AlertTransition, evaluate};
use crate::collector::Collector;
use crate::config::{Config, Thresholds};
use crate::endpoint::AgentEndpoint;
use crate::notify::Notifier;
use crate::state::MonitorState;
use crate::storage::MetricsStore;

use super::hub::HubHandle;
use super::messages::{CycleReport, HubMessage, PollerCommand};

/// Tunables of the poll loop.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub poll_interval: Duration,
    pub thresholds: Thresholds,
    pub top_n: usize,
    pub log_thresholds: bool,
    /// Upper bound on one notification fan-out inside a cycle.
    pub notify_timeout: Duration,
}

/// Fan-out budget used when the poller is built from [`Config`].
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

impl From<&Config> for PollerSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            thresholds: config.thresholds,
            top_n: config.top_processes,
            log_thresholds: config.log_thresholds,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }
}

/// Owns the endpoint list and the monitor state. Cheap to clone.
#[derive(Clone)]
pub struct Poller {
    endpoints: Arc<Vec<AgentEndpoint>>,
    settings: Arc<PollerSettings>,
    collector: Arc<dyn Collector>,
    notifier: Arc<dyn Notifier>,
    hub: HubHandle,
    store: Option<Arc<dyn MetricsStore>>,
    state: MonitorState,
}

impl Poller {
    pub fn new(
        endpoints: Vec<AgentEndpoint>,
        settings: PollerSettings,
        collector: Arc<dyn Collector>,
        notifier: Arc<dyn Notifier>,
        hub: HubHandle,
    ) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
            settings: Arc::new(settings),
            collector,
            notifier,
            hub,
            store: None,
            state: MonitorState::new(),
        }
    }

    /// Mirror collections and alert transitions into `store`.
    pub fn with_store(mut self, store: Arc<dyn MetricsStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn endpoints(&self) -> &[AgentEndpoint] {
        &self.endpoints
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    pub fn store(&self) -> Option<&Arc<dyn MetricsStore>> {
        self.store.as_ref()
    }

    /// Independent copies of the endpoint list and the latest snapshots.
    pub async fn snapshot(&self) -> (Vec<AgentEndpoint>, HashMap<AgentEndpoint, Metrics>) {
        (self.endpoints.to_vec(), self.state.latest().await)
    }

    /// Copy of the active alert set.
    pub async fn alerts(&self) -> ActiveAlerts {
        self.state.alerts().await
    }

    /// Collect every agent once, then publish the consolidated state.
    #[instrument(skip(self), fields(agents = self.endpoints.len()))]
    pub async fn run_cycle(&self) -> CycleReport {
        let mut tasks = JoinSet::new();
        for endpoint in self.endpoints.iter().cloned() {
            let poller = self.clone();
            tasks.spawn(async move { poller.poll_agent(endpoint).await });
        }

        let mut report = CycleReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => report.succeeded += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    error!("poll task panicked: {e}");
                    report.failed += 1;
                }
            }
        }

        let latest = self.state.latest().await;
        self.hub.publish(HubMessage::metrics_update(&latest));

        debug!(
            succeeded = report.succeeded,
            failed = report.failed,
            "poll cycle finished"
        );
        report
    }

    /// Returns whether the collection succeeded.
    #[instrument(skip_all, fields(agent = %endpoint))]
    async fn poll_agent(&self, endpoint: AgentEndpoint) -> bool {
        let metrics = match self.collector.collect(&endpoint).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!("collection failed: {e}");
                return false;
            }
        };

        self.state.set_metrics(endpoint.clone(), metrics.clone()).await;
        if let Some(store) = &self.store {
            if let Err(e) = store.set(&endpoint, metrics.clone()).await {
                warn!("failed to mirror metrics: {e}");
            }
        }

        self.check_alerts(&endpoint, &metrics).await;
        true
    }

    async fn check_alerts(&self, endpoint: &AgentEndpoint, metrics: &Metrics) {
        let PollerSettings {
            thresholds,
            top_n,
            log_thresholds,
            ..
        } = *self.settings;

        if log_thresholds {
            log_threshold_dump(metrics, &thresholds);
        }

        let transitions = self
            .state
            .update_alerts(|active| evaluate(active, endpoint, metrics, &thresholds, top_n))
            .await;

        for transition in transitions {
            self.dispatch(transition).await;
        }
    }

    async fn dispatch(&self, transition: AlertTransition) {
        if let Some(store) = &self.store {
            let mirrored = if transition.is_recovery() {
                store.delete_alert(&transition.key).await
            } else {
                store.set_alert(&transition.key).await
            };
            if let Err(e) = mirrored {
                warn!("failed to mirror alert state: {e}");
            }
        }

        self.hub.publish(HubMessage::alert(&transition));

        let kind = if transition.is_recovery() {
            "recovery"
        } else {
            "alert"
        };
        let send = self.notifier.send(&transition.subject, &transition.body);
        match timeout(self.settings.notify_timeout, send).await {
            Ok(Ok(())) => info!(subject = %transition.subject, "{kind} sent"),
            Ok(Err(e)) => warn!(subject = %transition.subject, "{kind} not delivered: {e}"),
            Err(_) => warn!(
                subject = %transition.subject,
                "{kind} not delivered: gave up after {:?}",
                self.settings.notify_timeout
            ),
        }
    }
}

fn log_threshold_dump(metrics: &Metrics, thresholds: &Thresholds) {
    let host = &metrics.hostname;
    info!(
        "threshold check host={host} cpu={:.1}% th={:.1}%",
        metrics.cpu.used_percent, thresholds.cpu
    );
    info!(
        "threshold check host={host} mem={:.1}% th={:.1}%",
        metrics.memory.used_percent, thresholds.mem
    );
    for disk in &metrics.disks {
        info!(
            "threshold check host={host} mount={} disk={:.1}% th={:.1}%",
            disk.mountpoint, disk.used_percent, thresholds.disk
        );
    }
    for process in &metrics.top_processes {
        info!(
            "threshold check host={host} pid={} name={} ram={:.1}% th={:.1}%",
            process.pid, process.name, process.percent_ram, thresholds.proc
        );
    }
}

struct PollerActor {
    poller: Poller,
    command_rx: mpsc::Receiver<PollerCommand>,
}

impl PollerActor {
    #[instrument(skip(self), name = "poller")]
    async fn run(mut self) {
        debug!("starting poller actor");

        let mut ticker = interval(self.poller.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                // Commands go first so a slow cycle cannot starve them
                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        PollerCommand::PollNow { respond_to } => {
                            debug!("received PollNow command");
                            let report = self.poller.run_cycle().await;
                            let _ = respond_to.send(report);
                        }

                        PollerCommand::Shutdown { respond_to } => {
                            debug!("received shutdown command");
                            let _ = respond_to.send(());
                            break;
                        }
                    }
                }

                // The first tick completes immediately
                _ = ticker.tick() => {
                    self.poller.run_cycle().await;
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("poller actor stopped");
    }
}

/// Handle for controlling a running poller
#[derive(Clone)]
pub struct PollerHandle {
    sender: mpsc::Sender<PollerCommand>,
    poller: Poller,
}

impl PollerHandle {
    /// Spawn the poll loop. The first cycle starts right away.
    pub fn spawn(poller: Poller) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = PollerActor {
            poller: poller.clone(),
            command_rx: cmd_rx,
        };
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            poller,
        }
    }

    /// Read access to the poller's state.
    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Run one extra cycle and wait for its outcome.
    pub async fn poll_now(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive response")
    }

    /// Stop the loop; returns once any in-flight cycle has finished.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::Shutdown { respond_to: tx })
            .await
            .context("failed to send Shutdown command")?;

        rx.await.context("failed to receive shutdown ack")
    }
}
