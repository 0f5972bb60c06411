use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::Metrics;
use crate::alerts::ActiveAlerts;
use crate::endpoint::AgentEndpoint;

/// Latest snapshot per endpoint plus the active alert set.
///
/// Each half has its own lock. Readers always get copies, never a guard.
#[derive(Clone, Default)]
pub struct MonitorState {
    latest: Arc<RwLock<HashMap<AgentEndpoint, Metrics>>>,
    alerts: Arc<RwLock<ActiveAlerts>>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the snapshot of one endpoint.
    pub async fn set_metrics(&self, endpoint: AgentEndpoint, metrics: Metrics) {
        self.latest.write().await.insert(endpoint, metrics);
    }

    pub async fn metrics(&self, endpoint: &AgentEndpoint) -> Option<Metrics> {
        self.latest.read().await.get(endpoint).cloned()
    }

    pub async fn latest(&self) -> HashMap<AgentEndpoint, Metrics> {
        self.latest.read().await.clone()
    }

    pub async fn alerts(&self) -> ActiveAlerts {
        self.alerts.read().await.clone()
    }

    /// Replace the active set with the result of `update`, atomically.
    ///
    /// `update` runs under the write lock and must not block.
    pub async fn update_alerts<T, F>(&self, update: F) -> T
    where
        F: FnOnce(&ActiveAlerts) -> (T, ActiveAlerts),
    {
        let mut alerts = self.alerts.write().await;
        let (output, next) = update(&alerts);
        *alerts = next;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKey;

    #[tokio::test]
    async fn test_copies_are_independent() {
        let state = MonitorState::new();
        let endpoint = AgentEndpoint::parse("http://a:1");
        state.set_metrics(endpoint.clone(), Metrics::default()).await;

        let mut copy = state.latest().await;
        copy.clear();

        assert!(state.metrics(&endpoint).await.is_some());
    }

    #[tokio::test]
    async fn test_update_alerts_replaces_set() {
        let state = MonitorState::new();
        let endpoint = AgentEndpoint::parse("http://a:1");

        let added = state
            .update_alerts(|current| {
                let mut next = current.clone();
                let added = next.insert(AlertKey::cpu(&endpoint));
                (added, next)
            })
            .await;

        assert!(added);
        assert!(state.alerts().await.contains(&AlertKey::cpu(&endpoint)));
    }
}
