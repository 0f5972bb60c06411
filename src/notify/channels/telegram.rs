use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::instrument;

use crate::config::TelegramConfig;
use crate::notify::{Notifier, NotifyError, Result};

use super::{WEBHOOK_TIMEOUT, check_response, webhook_client};

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

/// Sends a message through the Bot API `sendMessage` method.
#[derive(Clone)]
pub struct TelegramChannel {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        Self::with_timeout(config, WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(config: &TelegramConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: webhook_client(timeout)?,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    #[instrument(skip(self, body))]
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = SendMessage {
            chat_id: &self.chat_id,
            text: format!("{subject}\n{body}"),
        };
        // the request URL carries the bot token
        let response = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;
        check_response("telegram", response).await
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
