//! Notification dispatch.
//!
//! A [`Notifier`] delivers a `(subject, body)` pair. Channels are combined
//! with [`FanOut`] and wrapped in a [`Cooldown`] that suppresses repeats of
//! the same subject.

pub mod channels;
mod cooldown;
mod error;
mod fanout;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::NotifyConfig;

pub use channels::{DiscordChannel, EmailChannel, KafkaChannel, SlackChannel, TelegramChannel};
pub use cooldown::Cooldown;
pub use error::{ChannelFailure, NotifyError, Result};
pub use fanout::FanOut;

/// Delivers a subject and body to some destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<()>;

    /// Short channel name used in logs and error reports.
    fn name(&self) -> &str;
}

#[async_trait]
impl<N> Notifier for Arc<N>
where
    N: Notifier + ?Sized,
{
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        (**self).send(subject, body).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Build the dispatcher described by `config`.
///
/// Channels whose settings are invalid are logged and left out. With no
/// channel at all the result is an empty fan-out that always succeeds.
pub fn build_notifier(config: &NotifyConfig) -> Cooldown<FanOut> {
    let mut fanout = FanOut::new();

    if let Some(email) = &config.email {
        match EmailChannel::new(email) {
            Ok(channel) => fanout.push(channel),
            Err(e) => warn!("email channel disabled: {e}"),
        }
    }
    if let Some(slack) = &config.slack {
        match SlackChannel::new(slack) {
            Ok(channel) => fanout.push(channel),
            Err(e) => warn!("slack channel disabled: {e}"),
        }
    }
    if let Some(discord) = &config.discord {
        match DiscordChannel::new(discord) {
            Ok(channel) => fanout.push(channel),
            Err(e) => warn!("discord channel disabled: {e}"),
        }
    }
    if let Some(telegram) = &config.telegram {
        match TelegramChannel::new(telegram) {
            Ok(channel) => fanout.push(channel),
            Err(e) => warn!("telegram channel disabled: {e}"),
        }
    }
    if let Some(kafka) = &config.kafka {
        match KafkaChannel::new(kafka) {
            Ok(channel) => fanout.push(channel),
            Err(e) => warn!("kafka channel disabled: {e}"),
        }
    }

    if fanout.is_empty() {
        info!("no notification channel configured, alerts are only logged");
    } else {
        info!(channels = ?fanout.channel_names(), "notification channels ready");
    }

    Cooldown::new(fanout, config.cooldown())
}
