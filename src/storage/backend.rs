//! The `MetricsStore` trait
//!
//! A secondary, read-side copy of what the poller sees. A failing store is
//! logged by the poller and never stops a cycle.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Metrics;
use crate::alerts::AlertKey;
use crate::endpoint::AgentEndpoint;

use super::error::StoreResult;

#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Store the latest snapshot of an endpoint and stamp its update time.
    async fn set(&self, endpoint: &AgentEndpoint, metrics: Metrics) -> StoreResult<()>;

    async fn get(&self, endpoint: &AgentEndpoint) -> StoreResult<Option<Metrics>>;

    async fn get_all(&self) -> StoreResult<HashMap<AgentEndpoint, Metrics>>;

    /// Look an endpoint up by its raw or masked descriptor.
    async fn find_by_masked(&self, descriptor: &str)
    -> StoreResult<Option<(AgentEndpoint, Metrics)>>;

    async fn remove(&self, endpoint: &AgentEndpoint) -> StoreResult<()>;

    async fn set_alert(&self, key: &AlertKey) -> StoreResult<()>;

    async fn delete_alert(&self, key: &AlertKey) -> StoreResult<()>;

    async fn alerts(&self) -> StoreResult<Vec<AlertKey>>;

    async fn last_update(&self, endpoint: &AgentEndpoint) -> StoreResult<Option<DateTime<Utc>>>;
}
