//! Shared state of the API handlers

use chrono::{DateTime, Utc};

use crate::actors::{HubHandle, Poller};
use crate::endpoint::AgentEndpoint;
use crate::Metrics;

/// Handles passed to every API handler. Cheap to clone.
#[derive(Clone)]
pub struct ApiState {
    pub poller: Poller,
}

impl ApiState {
    pub fn new(poller: Poller) -> Self {
        Self { poller }
    }

    pub fn hub(&self) -> &HubHandle {
        self.poller.hub()
    }

    /// When the endpoint was last collected successfully.
    ///
    /// Prefers the secondary store's stamp and falls back to the
    /// snapshot's own generation time.
    pub async fn last_update(
        &self,
        endpoint: &AgentEndpoint,
        metrics: Option<&Metrics>,
    ) -> Option<DateTime<Utc>> {
        if let Some(store) = self.poller.store()
            && let Ok(Some(stamp)) = store.last_update(endpoint).await
        {
            return Some(stamp);
        }
        metrics.map(|m| m.generated_at_utc)
    }
}
