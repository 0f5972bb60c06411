//! Collectors turn an [`AgentEndpoint`] into a [`Metrics`] snapshot.
//!
//! Two transports exist: an HTTP agent serving `/metrics`, and plain SSH
//! where the snapshot is assembled from a handful of read-only shell
//! commands. [`TransportCollector`] picks the right one per endpoint and
//! bounds every collection with the same timeout.

pub mod http;
pub mod ssh;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::Metrics;
use crate::config::HostKeyPolicy;
use crate::endpoint::{AgentEndpoint, Transport};

pub use http::HttpCollector;
pub use ssh::SshCollector;

/// Why a single collection produced no metrics.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("agent answered with status {0}")]
    Status(u16),

    #[error("failed to decode metrics: {0}")]
    Decode(String),

    #[error("ssh error: {0}")]
    Ssh(String),

    #[error("ssh authentication rejected for user {0}")]
    Auth(String),

    #[error("remote command failed: {0}")]
    Command(String),

    #[error("collection timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of metrics for one endpoint.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(&self, endpoint: &AgentEndpoint) -> Result<Metrics, CollectError>;
}

/// Dispatches on the endpoint transport and enforces the collection timeout.
pub struct TransportCollector {
    http: HttpCollector,
    ssh: SshCollector,
    timeout: Duration,
}

impl TransportCollector {
    pub fn new(timeout: Duration, top_n: usize, host_keys: HostKeyPolicy) -> Self {
        Self {
            http: HttpCollector::new(top_n),
            ssh: SshCollector::new(top_n, host_keys),
            timeout,
        }
    }
}

#[async_trait]
impl Collector for TransportCollector {
    async fn collect(&self, endpoint: &AgentEndpoint) -> Result<Metrics, CollectError> {
        let collection = async {
            match endpoint.transport() {
                Transport::Http | Transport::Https => self.http.collect(endpoint).await,
                Transport::Ssh => self.ssh.collect(endpoint).await,
            }
        };

        tokio::time::timeout(self.timeout, collection)
            .await
            .map_err(|_| CollectError::Timeout(self.timeout))?
    }
}
