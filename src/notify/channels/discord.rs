use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::instrument;

use async_trait::async_trait;

use crate::config::DiscordConfig;
use crate::notify::{Notifier, Result};

use super::{WEBHOOK_TIMEOUT, check_response, webhook_client};

const RED: u32 = 15158332;
const GREEN: u32 = 3066993;
const ORANGE: u32 = 15105570;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

/// Posts an embed per alert to a Discord webhook, optionally pinging a user.
#[derive(Debug, Clone)]
pub struct DiscordChannel {
    client: Client,
    webhook_url: String,
    user_id: Option<String>,
}

impl DiscordChannel {
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        Self::with_timeout(config, WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(config: &DiscordConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: webhook_client(timeout)?,
            webhook_url: config.webhook_url.clone(),
            user_id: config.user_id.clone(),
        })
    }

    pub fn build_embed(subject: &str, body: &str) -> Embed {
        let color = if subject.starts_with("[RECOVERED]") {
            GREEN
        } else if subject.starts_with("[ALERT]") {
            RED
        } else {
            ORANGE
        };

        Embed {
            title: Some(subject.to_string()),
            description: Some(body.to_string()),
            color: Some(color),
            fields: Vec::new(),
            footer: Some(EmbedFooter {
                text: "fleetwatch".to_string(),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    fn build_message(&self, subject: &str, body: &str) -> Message {
        let mut builder = MessageBuilder::new();
        if let Some(user_id) = &self.user_id {
            builder = builder.content(format!("<@{user_id}>"));
        }
        builder.add_embed(Self::build_embed(subject, body)).build()
    }
}

#[async_trait]
impl Notifier for DiscordChannel {
    #[instrument(skip(self, body))]
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.build_message(subject, body);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await?;
        check_response("discord", response).await
    }

    fn name(&self) -> &str {
        "discord"
    }
}
