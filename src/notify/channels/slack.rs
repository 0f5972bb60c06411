use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::instrument;

use crate::config::SlackConfig;
use crate::notify::{Notifier, Result};

use super::{WEBHOOK_TIMEOUT, check_response, webhook_client};

#[derive(Debug, Serialize)]
struct SlackMessage {
    text: String,
}

/// Posts `*subject*\nbody` to an incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackChannel {
    client: Client,
    webhook_url: String,
}

impl SlackChannel {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        Self::with_timeout(config, WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(config: &SlackConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: webhook_client(timeout)?,
            webhook_url: config.webhook_url.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SlackChannel {
    #[instrument(skip(self, body))]
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = SlackMessage {
            text: format!("*{subject}*\n{body}"),
        };
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await?;
        check_response("slack", response).await
    }

    fn name(&self) -> &str {
        "slack"
    }
}
