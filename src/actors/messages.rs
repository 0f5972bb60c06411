//! Message types exchanged between actors
//!
//! This module defines the commands each actor accepts and the events the
//! broadcast hub fans out to its subscribers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::Metrics;
use crate::alerts::AlertTransition;
use crate::endpoint::AgentEndpoint;

/// A serialized hub event, shared between all subscribers.
pub type Frame = Arc<str>;

/// Event pushed to real-time subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubMessage {
    /// Full latest state, keyed by masked endpoint
    MetricsUpdate { data: BTreeMap<String, Metrics> },

    /// A single raise or recovery
    Alert {
        alert_type: AlertType,
        subject: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Alert,
    Recovery,
}

impl HubMessage {
    pub fn metrics_update(latest: &HashMap<AgentEndpoint, Metrics>) -> Self {
        HubMessage::MetricsUpdate {
            data: latest
                .iter()
                .map(|(endpoint, metrics)| (endpoint.masked().to_string(), metrics.clone()))
                .collect(),
        }
    }

    pub fn alert(transition: &AlertTransition) -> Self {
        HubMessage::Alert {
            alert_type: if transition.is_recovery() {
                AlertType::Recovery
            } else {
                AlertType::Alert
            },
            subject: transition.subject.clone(),
            message: transition.body.clone(),
        }
    }
}

/// Commands for the broadcast hub
#[derive(Debug)]
pub enum HubCommand {
    /// Add a subscriber with its own bounded buffer
    Register {
        id: u64,
        sender: mpsc::Sender<Frame>,
    },

    /// Remove a subscriber and close its channel
    Unregister { id: u64 },

    /// Fan an event out to every subscriber
    Publish(HubMessage),

    /// Number of registered subscribers
    Count { respond_to: oneshot::Sender<usize> },

    /// Stop the hub, closing every subscriber channel
    Shutdown,
}

/// Outcome of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Commands for the poller
#[derive(Debug)]
pub enum PollerCommand {
    /// Run one cycle right away and report the outcome
    PollNow {
        respond_to: oneshot::Sender<CycleReport>,
    },

    /// Stop after any in-flight cycle completes
    Shutdown { respond_to: oneshot::Sender<()> },
}
