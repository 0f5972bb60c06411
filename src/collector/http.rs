use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{instrument, trace};

use crate::Metrics;
use crate::endpoint::AgentEndpoint;

use super::{CollectError, Collector};

/// Fetches the JSON document an agent serves on `/metrics`.
///
/// One request per collection, no retries. The client is shared across
/// collections so connections are pooled.
#[derive(Clone)]
pub struct HttpCollector {
    client: reqwest::Client,
    top_n: usize,
}

impl HttpCollector {
    pub fn new(top_n: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            top_n,
        }
    }
}

#[async_trait]
impl Collector for HttpCollector {
    #[instrument(skip_all, fields(agent = %endpoint))]
    async fn collect(&self, endpoint: &AgentEndpoint) -> Result<Metrics, CollectError> {
        let response = self.client.get(endpoint.metrics_url()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let mut metrics: Metrics =
            serde_json::from_slice(&body).map_err(|e| CollectError::Decode(e.to_string()))?;

        if metrics.generated_at_utc == DateTime::<Utc>::default() {
            metrics.generated_at_utc = Utc::now();
        }

        trace!("decoded metrics from {}", metrics.hostname);
        Ok(metrics.normalize(self.top_n))
    }
}
