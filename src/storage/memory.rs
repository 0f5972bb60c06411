//! In-memory store (no persistence)

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::trace;

use crate::Metrics;
use crate::alerts::AlertKey;
use crate::endpoint::AgentEndpoint;

use super::backend::MetricsStore;
use super::error::{StoreError, StoreResult};

#[derive(Default)]
struct Entries {
    metrics: HashMap<AgentEndpoint, Metrics>,
    last_updates: HashMap<AgentEndpoint, DateTime<Utc>>,
}

/// Maps behind `RwLock`s. All data is lost on restart.
///
/// Once [`close`](Self::close)d, every operation fails with
/// [`StoreError::Unavailable`].
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<Entries>,
    alerts: RwLock<HashSet<AlertKey>>,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all data and refuse further operations.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        *self.entries.write().await = Entries::default();
        self.alerts.write().await.clear();
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsStore for InMemoryStore {
    async fn set(&self, endpoint: &AgentEndpoint, metrics: Metrics) -> StoreResult<()> {
        self.ensure_open()?;
        trace!(agent = %endpoint, "storing metrics");
        let mut entries = self.entries.write().await;
        entries.metrics.insert(endpoint.clone(), metrics);
        entries.last_updates.insert(endpoint.clone(), Utc::now());
        Ok(())
    }

    async fn get(&self, endpoint: &AgentEndpoint) -> StoreResult<Option<Metrics>> {
        self.ensure_open()?;
        Ok(self.entries.read().await.metrics.get(endpoint).cloned())
    }

    async fn get_all(&self) -> StoreResult<HashMap<AgentEndpoint, Metrics>> {
        self.ensure_open()?;
        Ok(self.entries.read().await.metrics.clone())
    }

    async fn find_by_masked(
        &self,
        descriptor: &str,
    ) -> StoreResult<Option<(AgentEndpoint, Metrics)>> {
        self.ensure_open()?;
        let entries = self.entries.read().await;
        Ok(entries
            .metrics
            .iter()
            .find(|(endpoint, _)| endpoint.matches(descriptor))
            .map(|(endpoint, metrics)| (endpoint.clone(), metrics.clone())))
    }

    async fn remove(&self, endpoint: &AgentEndpoint) -> StoreResult<()> {
        self.ensure_open()?;
        let mut entries = self.entries.write().await;
        entries.metrics.remove(endpoint);
        entries.last_updates.remove(endpoint);
        Ok(())
    }

    async fn set_alert(&self, key: &AlertKey) -> StoreResult<()> {
        self.ensure_open()?;
        self.alerts.write().await.insert(key.clone());
        Ok(())
    }

    async fn delete_alert(&self, key: &AlertKey) -> StoreResult<()> {
        self.ensure_open()?;
        self.alerts.write().await.remove(key);
        Ok(())
    }

    async fn alerts(&self) -> StoreResult<Vec<AlertKey>> {
        self.ensure_open()?;
        Ok(self.alerts.read().await.iter().cloned().collect())
    }

    async fn last_update(&self, endpoint: &AgentEndpoint) -> StoreResult<Option<DateTime<Utc>>> {
        self.ensure_open()?;
        Ok(self.entries.read().await.last_updates.get(endpoint).copied())
    }
}
