//! Threshold alerting with hysteresis.
//!
//! An alert is raised once when a value reaches its threshold and stays
//! silent until the value drops below it again. Which conditions are
//! currently raised lives in [`ActiveAlerts`].

pub mod engine;
mod key;

use std::collections::HashSet;

use crate::endpoint::AgentEndpoint;

pub use engine::{AlertState, AlertTransition, ThresholdEvaluation, evaluate};
pub use key::{AlertKey, MetricKind};

/// Set of alert conditions that are currently raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveAlerts {
    keys: HashSet<AlertKey>,
}

impl ActiveAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &AlertKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns `true` if the key was not active before.
    pub fn insert(&mut self, key: AlertKey) -> bool {
        self.keys.insert(key)
    }

    /// Returns `true` if the key was active.
    pub fn remove(&mut self, key: &AlertKey) -> bool {
        self.keys.remove(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlertKey> {
        self.keys.iter()
    }

    /// Active keys of one endpoint.
    pub fn for_endpoint<'a>(
        &'a self,
        endpoint: &'a AgentEndpoint,
    ) -> impl Iterator<Item = &'a AlertKey> + 'a {
        self.keys.iter().filter(move |key| &key.endpoint == endpoint)
    }
}

impl FromIterator<AlertKey> for ActiveAlerts {
    fn from_iter<T: IntoIterator<Item = AlertKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
