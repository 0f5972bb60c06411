//! Fakes and builders shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fleetwatch::{
    CpuInfo, MemoryInfo, Metrics,
    actors::{HubHandle, Poller, PollerSettings},
    collector::{CollectError, Collector},
    config::Thresholds,
    endpoint::AgentEndpoint,
    notify::{Notifier, NotifyError},
};
use std::sync::Arc;

pub fn metrics(hostname: &str, cpu: f64, mem_percent: u64) -> Metrics {
    Metrics {
        hostname: hostname.to_string(),
        cpu: CpuInfo {
            cores: 4,
            used_percent: cpu,
            model_name: "test cpu".to_string(),
        },
        memory: MemoryInfo {
            total: 1000,
            used: mem_percent * 10,
            free: 1000 - mem_percent * 10,
            used_percent: 0.0,
        },
        generated_at_utc: Utc::now(),
        ..Default::default()
    }
    .normalize(5)
}

/// Serves a fixed snapshot per raw endpoint; endpoints without one fail.
#[derive(Default)]
pub struct FakeCollector {
    snapshots: Mutex<HashMap<String, Metrics>>,
    calls: AtomicUsize,
}

impl FakeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, endpoint: &AgentEndpoint, metrics: Metrics) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(endpoint.expose_secret().to_string(), metrics);
    }

    pub fn fail(&self, endpoint: &AgentEndpoint) {
        self.snapshots
            .lock()
            .unwrap()
            .remove(endpoint.expose_secret());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Collector for FakeCollector {
    async fn collect(&self, endpoint: &AgentEndpoint) -> Result<Metrics, CollectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .lock()
            .unwrap()
            .get(endpoint.expose_secret())
            .cloned()
            .ok_or(CollectError::Timeout(Duration::from_secs(5)))
    }
}

/// Records every delivered notification.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(subject, _)| subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str) -> fleetwatch::notify::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Always fails.
pub struct BrokenNotifier;

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn send(&self, _subject: &str, _body: &str) -> fleetwatch::notify::Result<()> {
        Err(NotifyError::NotConfigured("broken".to_string()))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

pub fn settings() -> PollerSettings {
    PollerSettings {
        poll_interval: Duration::from_secs(3600),
        thresholds: Thresholds::default(),
        top_n: 5,
        log_thresholds: false,
        notify_timeout: Duration::from_secs(5),
    }
}

pub fn endpoints(n: usize) -> Vec<AgentEndpoint> {
    (0..n)
        .map(|i| AgentEndpoint::parse(&format!("http://10.0.0.{i}:9123")))
        .collect()
}

pub fn poller(
    endpoints: Vec<AgentEndpoint>,
    collector: Arc<FakeCollector>,
    notifier: Arc<dyn Notifier>,
    hub: HubHandle,
) -> Poller {
    Poller::new(endpoints, settings(), collector, notifier, hub)
}
